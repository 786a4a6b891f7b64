//! Delimiter-pair spans: emphasis and the `==mark==` family.
//!
//! A span needs an opener run of exactly the rule's length followed by a
//! non-space character, and a closer run of the same length preceded by a
//! non-space character inside the current range. Without a closer the opener
//! is kept as literal text.

use super::{InlineRule, InlineState};
use crate::token::Nesting;
use crate::util::is_ascii_punct;

/// Number of consecutive `marker` characters starting at byte `pos`.
#[must_use]
pub fn marker_run(src: &str, pos: usize, marker: char) -> usize {
    src[pos..].chars().take_while(|&c| c == marker).count()
}

/// End of a code span whose opener run of `run` backticks ends at `from`.
pub(crate) fn find_code_span_end(src: &str, from: usize, end: usize, run: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut i = from;
    while i < end {
        if bytes[i] == b'`' {
            let len = marker_run(&src[..end], i, '`');
            if len == run {
                return Some(i + len);
            }
            i += len;
        } else {
            i += 1;
        }
    }
    None
}

/// Find a closing run of exactly `count` markers in `[from, end)`.
///
/// Backslash escapes and code spans are skipped. With `intraword` off, a
/// closer directly followed by an alphanumeric character does not count.
/// Returns the byte offset of the closing run.
#[must_use]
pub fn find_closer(
    src: &str,
    from: usize,
    end: usize,
    marker: char,
    count: usize,
    intraword: bool,
) -> Option<usize> {
    let scope = &src[..end];
    let mut i = from;
    while i < end {
        let c = scope[i..].chars().next()?;
        if c == '\\' {
            i += 1;
            if let Some(escaped) = scope[i..].chars().next() {
                i += escaped.len_utf8();
            }
            continue;
        }
        if c == '`' {
            let run = marker_run(scope, i, '`');
            i = find_code_span_end(src, i + run, end, run).unwrap_or(i + run);
            continue;
        }
        if c == marker {
            let run = marker_run(scope, i, marker);
            let after = i + run * marker.len_utf8();
            let prev = scope[..i].chars().next_back();
            let next = scope[after..].chars().next();
            if run == count
                && i > from
                && prev.is_some_and(|p| !p.is_whitespace())
                && (intraword || !next.is_some_and(char::is_alphanumeric))
            {
                return Some(i);
            }
            i = after;
            continue;
        }
        i += c.len_utf8();
    }
    None
}

/// Whether `s` contains whitespace not preceded by a backslash.
fn has_unescaped_whitespace(s: &str) -> bool {
    let mut escaped = false;
    for c in s.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c.is_whitespace() {
            return true;
        }
    }
    false
}

/// Resolve escapes of punctuation and spaces.
fn unescape_plain(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(&next) = chars.peek()
            && (next == ' ' || is_ascii_punct(next))
        {
            out.push(next);
            chars.next();
            continue;
        }
        out.push(c);
    }
    out
}

/// Inline rule for a symmetric delimiter pair such as `==x==` or `^x^`.
///
/// # Example
///
/// ```
/// use plume_renderer::{DelimitedRule, MarkdownEngine};
///
/// let mut engine = MarkdownEngine::new();
/// engine
///     .inline_mut()
///     .before("emphasis", Box::new(DelimitedRule::new("mark", '=', 2)))
///     .unwrap();
/// assert_eq!(engine.render("==hi=="), "<p><mark>hi</mark></p>\n");
/// ```
#[derive(Clone, Debug)]
pub struct DelimitedRule {
    name: &'static str,
    kind: &'static str,
    tag: &'static str,
    marker: char,
    count: usize,
    plain: bool,
}

impl DelimitedRule {
    /// Create a rule whose token kind and HTML tag equal its name.
    #[must_use]
    pub const fn new(name: &'static str, marker: char, count: usize) -> Self {
        Self {
            name,
            kind: name,
            tag: name,
            marker,
            count,
            plain: false,
        }
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: &'static str) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub const fn with_tag(mut self, tag: &'static str) -> Self {
        self.tag = tag;
        self
    }

    /// Treat the content as plain text: no unescaped whitespace allowed, no
    /// nested spans, escapes resolved.
    #[must_use]
    pub const fn plain(mut self) -> Self {
        self.plain = true;
        self
    }

    fn markup(&self) -> String {
        self.marker.to_string().repeat(self.count)
    }
}

impl InlineRule for DelimitedRule {
    fn name(&self) -> &str {
        self.name
    }

    fn triggers(&self) -> &[char] {
        std::slice::from_ref(&self.marker)
    }

    fn apply(&self, state: &mut InlineState<'_, '_>) -> bool {
        let src = state.src;
        let start = state.pos;
        if state.peek() != Some(self.marker) || state.prev_char() == Some(self.marker) {
            return false;
        }
        let run = marker_run(&src[..state.pos_max], start, self.marker);
        if run != self.count {
            return false;
        }
        let content_start = start + run * self.marker.len_utf8();
        if src[content_start..state.pos_max]
            .chars()
            .next()
            .is_none_or(char::is_whitespace)
        {
            return false;
        }

        let Some(close) = find_closer(src, content_start, state.pos_max, self.marker, self.count, true)
        else {
            state.push_pending(&src[start..content_start]);
            state.pos = content_start;
            return true;
        };

        let content = &src[content_start..close];
        if self.plain && has_unescaped_whitespace(content) {
            return false;
        }

        let open = state.push(self.kind, self.tag, Nesting::Open);
        state.token_mut(open).markup = self.markup();
        if self.plain {
            let text = state.push("text", "", Nesting::SelfClosing);
            state.token_mut(text).content = unescape_plain(content);
        } else {
            state.tokenize_range(content_start, close);
        }
        let close_id = state.push(self.kind, self.tag, Nesting::Close);
        state.token_mut(close_id).markup = self.markup();

        state.pos = close + run * self.marker.len_utf8();
        true
    }
}

/// `*em*`, `**strong**`, `***both***` and the `_` variants.
///
/// Runs longer than three are literal. `_` does not open or close inside a
/// word.
pub struct EmphasisRule;

impl InlineRule for EmphasisRule {
    fn name(&self) -> &str {
        "emphasis"
    }

    fn apply(&self, state: &mut InlineState<'_, '_>) -> bool {
        let src = state.src;
        let start = state.pos;
        let Some(marker) = state.peek().filter(|&c| c == '*' || c == '_') else {
            return false;
        };
        if state.prev_char() == Some(marker) {
            return false;
        }
        let run = marker_run(&src[..state.pos_max], start, marker);
        let content_start = start + run;
        if run > 3 {
            state.push_pending(&src[start..content_start]);
            state.pos = content_start;
            return true;
        }
        if src[content_start..state.pos_max]
            .chars()
            .next()
            .is_none_or(char::is_whitespace)
        {
            return false;
        }
        let intraword = marker == '*';
        if !intraword && state.prev_char().is_some_and(char::is_alphanumeric) {
            return false;
        }

        let Some(close) = find_closer(src, content_start, state.pos_max, marker, run, intraword)
        else {
            state.push_pending(&src[start..content_start]);
            state.pos = content_start;
            return true;
        };

        let layers: &[(&'static str, &'static str, usize)] = match run {
            1 => &[("em", "em", 1)],
            2 => &[("strong", "strong", 2)],
            _ => &[("em", "em", 1), ("strong", "strong", 2)],
        };
        for &(kind, tag, len) in layers {
            let id = state.push(kind, tag, Nesting::Open);
            state.token_mut(id).markup = marker.to_string().repeat(len);
        }
        state.tokenize_range(content_start, close);
        for &(kind, tag, len) in layers.iter().rev() {
            let id = state.push(kind, tag, Nesting::Close);
            state.token_mut(id).markup = marker.to_string().repeat(len);
        }

        state.pos = close + run;
        true
    }
}
