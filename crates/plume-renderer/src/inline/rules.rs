//! Leaf inline rules: text runs, breaks, escapes, code spans, autolinks,
//! raw HTML and entities.

use std::sync::LazyLock;

use regex::Regex;

use super::delimited::{find_code_span_end, marker_run};
use super::{InlineRule, InlineState};
use crate::token::Nesting;
use crate::util::{HTML_TAG, decode_entity, is_ascii_punct};

/// Characters that may start built-in inline syntax.
pub(super) fn is_terminator(c: char) -> bool {
    matches!(
        c,
        '\n' | '!'
            | '#'
            | '$'
            | '%'
            | '&'
            | '*'
            | '+'
            | '-'
            | ':'
            | '<'
            | '='
            | '>'
            | '@'
            | '['
            | '\\'
            | ']'
            | '^'
            | '_'
            | '`'
            | '{'
            | '}'
            | '~'
    )
}

/// Consume a run of characters no other rule can start on.
pub(crate) struct TextRule;

impl InlineRule for TextRule {
    fn name(&self) -> &str {
        "text"
    }

    fn apply(&self, state: &mut InlineState<'_, '_>) -> bool {
        let rest = state.rest();
        let len = rest.find(|c| state.is_trigger(c)).unwrap_or(rest.len());
        if len == 0 {
            return false;
        }
        state.push_pending(&rest[..len]);
        state.pos += len;
        true
    }
}

/// Advance past leading spaces of a continuation line.
fn skip_spaces(state: &mut InlineState<'_, '_>) {
    while state.pos < state.pos_max && state.src.as_bytes()[state.pos] == b' ' {
        state.pos += 1;
    }
}

/// Line breaks: two trailing spaces make a hard break, otherwise soft.
pub(crate) struct NewlineRule;

impl InlineRule for NewlineRule {
    fn name(&self) -> &str {
        "newline"
    }

    fn apply(&self, state: &mut InlineState<'_, '_>) -> bool {
        if state.peek() != Some('\n') {
            return false;
        }
        let pending = state.pending_mut();
        let kept = pending.trim_end_matches(' ').len();
        let spaces = pending.len() - kept;
        pending.truncate(kept);

        let (kind, tag) = if spaces >= 2 {
            ("hardbreak", "br")
        } else {
            ("softbreak", "br")
        };
        state.push(kind, tag, Nesting::SelfClosing);
        state.pos += 1;
        skip_spaces(state);
        true
    }
}

/// Backslash escapes of ASCII punctuation and backslash hard breaks.
pub(crate) struct EscapeRule;

impl InlineRule for EscapeRule {
    fn name(&self) -> &str {
        "escape"
    }

    fn apply(&self, state: &mut InlineState<'_, '_>) -> bool {
        if state.peek() != Some('\\') {
            return false;
        }
        match state.rest()[1..].chars().next() {
            Some('\n') => {
                state.push("hardbreak", "br", Nesting::SelfClosing);
                state.pos += 2;
                skip_spaces(state);
            }
            Some(c) if is_ascii_punct(c) => {
                state.push_text_special(c.to_string(), format!("\\{c}"));
                state.pos += 1 + c.len_utf8();
            }
            _ => {
                state.push_pending("\\");
                state.pos += 1;
            }
        }
        true
    }
}

/// Code spans delimited by equal-length backtick runs.
pub(crate) struct BackticksRule;

impl InlineRule for BackticksRule {
    fn name(&self) -> &str {
        "backticks"
    }

    fn apply(&self, state: &mut InlineState<'_, '_>) -> bool {
        if state.peek() != Some('`') {
            return false;
        }
        let src = state.src;
        let start = state.pos;
        let run = marker_run(&src[..state.pos_max], start, '`');
        let Some(end) = find_code_span_end(src, start + run, state.pos_max, run) else {
            state.push_pending(&src[start..start + run]);
            state.pos = start + run;
            return true;
        };

        let mut content = src[start + run..end - run].replace('\n', " ");
        if content.len() >= 2
            && content.starts_with(' ')
            && content.ends_with(' ')
            && !content.trim().is_empty()
        {
            content = content[1..content.len() - 1].to_owned();
        }

        let id = state.push("code_inline", "code", Nesting::SelfClosing);
        let token = state.token_mut(id);
        token.content = content;
        token.markup = "`".repeat(run);
        state.pos = end;
        true
    }
}

static AUTOLINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<([a-zA-Z][a-zA-Z0-9+.\-]{1,31}:[^<>\x00-\x20]*)>")
        .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^<([a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*)>",
    )
    .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// `<https://example.com>` and `<user@example.com>`.
pub(crate) struct AutolinkRule;

impl InlineRule for AutolinkRule {
    fn name(&self) -> &str {
        "autolink"
    }

    fn apply(&self, state: &mut InlineState<'_, '_>) -> bool {
        if state.peek() != Some('<') || state.in_link {
            return false;
        }
        let rest = state.rest();
        let (full, text, href) = if let Some(caps) = AUTOLINK.captures(rest) {
            let url = caps[1].to_owned();
            (caps[0].len(), url.clone(), url)
        } else if let Some(caps) = EMAIL.captures(rest) {
            let email = caps[1].to_owned();
            (caps[0].len(), email.clone(), format!("mailto:{email}"))
        } else {
            return false;
        };

        let open = state.push("link", "a", Nesting::Open);
        let token = state.token_mut(open);
        token.attrs.set("href", href);
        token.markup = "autolink".to_owned();
        token.info = "auto".to_owned();
        let text_id = state.push("text", "", Nesting::SelfClosing);
        state.token_mut(text_id).content = text;
        let close = state.push("link", "a", Nesting::Close);
        let token = state.token_mut(close);
        token.markup = "autolink".to_owned();
        token.info = "auto".to_owned();
        state.pos += full;
        true
    }
}

/// Inline raw HTML tags, recognized only when raw HTML is enabled.
pub(crate) struct HtmlInlineRule;

impl InlineRule for HtmlInlineRule {
    fn name(&self) -> &str {
        "html_inline"
    }

    fn apply(&self, state: &mut InlineState<'_, '_>) -> bool {
        if !state.options.raw_html || state.peek() != Some('<') {
            return false;
        }
        let Some(m) = HTML_TAG.find(state.rest()) else {
            return false;
        };
        let tag = m.as_str().to_owned();
        let len = tag.len();
        let id = state.push("html_inline", "", Nesting::SelfClosing);
        let token = state.token_mut(id);
        token.content = tag;
        token.raw = true;
        state.pos += len;
        true
    }
}

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[a-zA-Z][a-zA-Z0-9]{1,31});")
        .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// Named and numeric character references.
///
/// Decoded characters become `text_special` tokens, so `&amp;` renders as
/// `&amp;` rather than being escaped twice.
pub(crate) struct EntityRule;

impl InlineRule for EntityRule {
    fn name(&self) -> &str {
        "entity"
    }

    fn apply(&self, state: &mut InlineState<'_, '_>) -> bool {
        if state.peek() != Some('&') {
            return false;
        }
        let rest = state.rest();
        match ENTITY.captures(rest) {
            Some(caps) => {
                let full = caps[0].to_owned();
                match decode_entity(&caps[1]) {
                    Some(decoded) => state.push_text_special(decoded, full.clone()),
                    None => state.push_pending(&full),
                }
                state.pos += full.len();
            }
            None => {
                state.push_pending("&");
                state.pos += 1;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::{MarkdownEngine, RenderOptions};

    fn render(input: &str) -> String {
        MarkdownEngine::new().render(input)
    }

    #[test]
    fn test_breaks() {
        assert_eq!(render("a\nb"), "<p>a\nb</p>\n");
        assert_eq!(render("a  \nb"), "<p>a<br>\nb</p>\n");
        assert_eq!(render("a\\\nb"), "<p>a<br>\nb</p>\n");
    }

    #[test]
    fn test_breaks_option() {
        let engine = MarkdownEngine::with_options(RenderOptions::new().with_breaks(true));
        assert_eq!(engine.render("a\nb"), "<p>a<br>\nb</p>\n");
    }

    #[test]
    fn test_escapes() {
        assert_eq!(render(r"\*not em\*"), "<p>*not em*</p>\n");
        assert_eq!(render(r"\a"), "<p>\\a</p>\n");
        assert_eq!(render(r"\<b>"), "<p>&lt;b&gt;</p>\n");
    }

    #[test]
    fn test_code_span() {
        assert_eq!(render("`a < b`"), "<p><code>a &lt; b</code></p>\n");
        assert_eq!(render("`` a`b ``"), "<p><code>a`b</code></p>\n");
        assert_eq!(render("`open"), "<p>`open</p>\n");
        assert_eq!(render("`*not em*`"), "<p><code>*not em*</code></p>\n");
    }

    #[test]
    fn test_autolink() {
        assert_eq!(
            render("<https://example.com>"),
            "<p><a href=\"https://example.com\">https://example.com</a></p>\n"
        );
        assert_eq!(
            render("<me@example.com>"),
            "<p><a href=\"mailto:me@example.com\">me@example.com</a></p>\n"
        );
    }

    #[test]
    fn test_html_inline() {
        assert_eq!(render("a <b>x</b>"), "<p>a &lt;b&gt;x&lt;/b&gt;</p>\n");
        let engine = MarkdownEngine::with_options(RenderOptions::new().with_raw_html(true));
        assert_eq!(engine.render("a <b>x</b>"), "<p>a <b>x</b></p>\n");
    }

    #[test]
    fn test_entities() {
        assert_eq!(render("&amp;"), "<p>&amp;</p>\n");
        assert_eq!(render("&copy; &#35; &#x41;"), "<p>© # A</p>\n");
        assert_eq!(render("&bogus; & x"), "<p>&amp;bogus; &amp; x</p>\n");
    }
}
