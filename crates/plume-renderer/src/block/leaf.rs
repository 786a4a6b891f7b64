//! Leaf block rules: paragraphs, headings, rules, code and references.

use std::sync::LazyLock;

use regex::Regex;

use super::{BlockRule, BlockState, strip_indent};
use crate::env::LinkReference;
use crate::token::Nesting;
use crate::util::{self, HTML_LONE_TAG};

const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Detect if a line starts a code fence.
///
/// Returns the fence character and length if found.
#[must_use]
pub fn detect_fence(trimmed: &str) -> Option<(char, usize)> {
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }

    let count = trimmed.chars().take_while(|&c| c == first).count();
    if count >= 3 { Some((first, count)) } else { None }
}

/// Check if a line is a valid closing fence.
///
/// The closing fence must use the same character as the opening one, be at
/// least as long, and contain nothing but whitespace after it.
fn is_closing_fence(trimmed: &str, expected_char: char, min_len: usize) -> bool {
    let count = trimmed.chars().take_while(|&c| c == expected_char).count();
    count >= min_len && trimmed[count..].trim().is_empty()
}

/// Fallback rule: consecutive non-blank lines form a paragraph.
pub(crate) struct ParagraphRule;

impl BlockRule for ParagraphRule {
    fn name(&self) -> &str {
        "paragraph"
    }

    fn apply(&self, state: &mut BlockState<'_, '_>, _silent: bool) -> bool {
        let start = state.line;
        let mut next = start + 1;
        while next < state.line_max && !state.is_blank(next) && !state.interrupts_paragraph(next) {
            next += 1;
        }

        let content = (start..next)
            .map(|n| state.line_str(n).trim_start())
            .collect::<Vec<_>>()
            .join("\n");

        let open = state.push("paragraph", "p", Nesting::Open);
        state.set_map(open, start, next);
        state.push_inline(content.trim_end(), start, next);
        state.push("paragraph", "p", Nesting::Close);
        state.line = next;
        true
    }
}

/// ATX heading: `# Title`.
pub(crate) struct HeadingRule;

impl BlockRule for HeadingRule {
    fn name(&self) -> &str {
        "heading"
    }

    fn interrupts_paragraph(&self) -> bool {
        true
    }

    fn apply(&self, state: &mut BlockState<'_, '_>, silent: bool) -> bool {
        let line = state.line;
        if state.indent(line) >= 4 {
            return false;
        }
        let trimmed = state.line_str(line).trim_start();
        let level = trimmed.chars().take_while(|&c| c == '#').count();
        if level == 0 || level > 6 {
            return false;
        }
        let after = &trimmed[level..];
        if !after.is_empty() && !after.starts_with([' ', '\t']) {
            return false;
        }
        if silent {
            return true;
        }

        let mut content = after.trim();
        let stripped = content.trim_end_matches('#');
        if stripped.is_empty() {
            content = "";
        } else if stripped.len() < content.len() && stripped.ends_with([' ', '\t']) {
            content = stripped.trim_end();
        }

        let tag = HEADING_TAGS[level - 1];
        let open = state.push("heading", tag, Nesting::Open);
        state.token_mut(open).markup = "#".repeat(level);
        state.set_map(open, line, line + 1);
        state.push_inline(content, line, line + 1);
        let close = state.push("heading", tag, Nesting::Close);
        state.token_mut(close).markup = "#".repeat(level);
        state.line = line + 1;
        true
    }
}

/// Setext heading: text underlined with `===` or `---`.
pub(crate) struct LHeadingRule;

impl BlockRule for LHeadingRule {
    fn name(&self) -> &str {
        "lheading"
    }

    fn apply(&self, state: &mut BlockState<'_, '_>, _silent: bool) -> bool {
        let start = state.line;
        if state.indent(start) >= 4 {
            return false;
        }
        let mut next = start + 1;
        let mut found = None;
        while next < state.line_max && !state.is_blank(next) {
            if state.indent(next) < 4
                && let Some(marker) = setext_underline(state.line_str(next))
            {
                found = Some(marker);
                break;
            }
            if state.interrupts_paragraph(next) {
                break;
            }
            next += 1;
        }
        let Some(marker) = found else {
            return false;
        };

        let content = (start..next)
            .map(|n| state.line_str(n).trim_start())
            .collect::<Vec<_>>()
            .join("\n");
        let content = content.trim();
        if content.is_empty() {
            return false;
        }

        let tag = if marker == '=' { "h1" } else { "h2" };
        let open = state.push("heading", tag, Nesting::Open);
        state.token_mut(open).markup = marker.to_string();
        state.set_map(open, start, next + 1);
        state.push_inline(content, start, next);
        let close = state.push("heading", tag, Nesting::Close);
        state.token_mut(close).markup = marker.to_string();
        state.line = next + 1;
        true
    }
}

fn setext_underline(line: &str) -> Option<char> {
    let trimmed = line.trim();
    let first = trimmed.chars().next()?;
    (matches!(first, '=' | '-') && trimmed.chars().all(|c| c == first)).then_some(first)
}

/// Thematic break: three or more `*`, `-` or `_`.
pub(crate) struct HrRule;

impl BlockRule for HrRule {
    fn name(&self) -> &str {
        "hr"
    }

    fn interrupts_paragraph(&self) -> bool {
        true
    }

    fn apply(&self, state: &mut BlockState<'_, '_>, silent: bool) -> bool {
        let line = state.line;
        if state.indent(line) >= 4 {
            return false;
        }
        let trimmed = state.line_str(line).trim();
        let Some(marker) = trimmed.chars().next() else {
            return false;
        };
        if !matches!(marker, '*' | '-' | '_') {
            return false;
        }
        let mut count = 0;
        for c in trimmed.chars() {
            if c == marker {
                count += 1;
            } else if c != ' ' && c != '\t' {
                return false;
            }
        }
        if count < 3 {
            return false;
        }
        if silent {
            return true;
        }

        let id = state.push("hr", "hr", Nesting::SelfClosing);
        state.token_mut(id).markup = marker.to_string().repeat(count);
        state.set_map(id, line, line + 1);
        state.line = line + 1;
        true
    }
}

/// Indented code block (four or more spaces).
pub(crate) struct CodeRule;

impl BlockRule for CodeRule {
    fn name(&self) -> &str {
        "code"
    }

    fn apply(&self, state: &mut BlockState<'_, '_>, _silent: bool) -> bool {
        let start = state.line;
        if state.indent(start) < 4 {
            return false;
        }
        let mut last = start;
        let mut next = start + 1;
        while next < state.line_max {
            if state.is_blank(next) {
                next += 1;
            } else if state.indent(next) >= 4 {
                last = next;
                next += 1;
            } else {
                break;
            }
        }

        let mut content = String::new();
        for n in start..=last {
            content.push_str(strip_indent(state.line_str(n), 4));
            content.push('\n');
        }

        let id = state.push("code_block", "code", Nesting::SelfClosing);
        state.token_mut(id).content = content;
        state.set_map(id, start, last + 1);
        state.line = last + 1;
        true
    }
}

/// Fenced code block with ```` ``` ```` or `~~~`.
///
/// A fence without a closing line runs to the end of its container.
pub(crate) struct FenceRule;

impl BlockRule for FenceRule {
    fn name(&self) -> &str {
        "fence"
    }

    fn interrupts_paragraph(&self) -> bool {
        true
    }

    fn apply(&self, state: &mut BlockState<'_, '_>, silent: bool) -> bool {
        let start = state.line;
        let indent = state.indent(start);
        if indent >= 4 {
            return false;
        }
        let trimmed = state.line_str(start).trim_start();
        let Some((fence_char, fence_len)) = detect_fence(trimmed) else {
            return false;
        };
        let info = trimmed[fence_len..].trim();
        if fence_char == '`' && info.contains('`') {
            return false;
        }
        if silent {
            return true;
        }

        let mut next = start + 1;
        let mut closed = false;
        while next < state.line_max {
            let line = state.line_str(next);
            if state.indent(next) < 4 && is_closing_fence(line.trim_start(), fence_char, fence_len) {
                closed = true;
                break;
            }
            next += 1;
        }

        let mut content = String::new();
        for n in start + 1..next {
            content.push_str(strip_indent(state.line_str(n), indent));
            content.push('\n');
        }
        let end = if closed { next + 1 } else { next };

        let id = state.push("fence", "code", Nesting::SelfClosing);
        let token = state.token_mut(id);
        token.content = content;
        token.info = info.to_owned();
        token.markup = fence_char.to_string().repeat(fence_len);
        state.set_map(id, start, end);
        state.line = end;
        true
    }
}

/// Link reference definition: `[label]: /url "title"`.
///
/// Emits no tokens; the definition is stored in the environment.
pub(crate) struct ReferenceRule;

impl BlockRule for ReferenceRule {
    fn name(&self) -> &str {
        "reference"
    }

    fn apply(&self, state: &mut BlockState<'_, '_>, silent: bool) -> bool {
        let line = state.line;
        if state.indent(line) >= 4 {
            return false;
        }
        let Some((label, reference)) = parse_reference(state.line_str(line).trim_start()) else {
            return false;
        };
        if silent {
            return true;
        }
        state.env.define_reference(label, reference);
        state.line = line + 1;
        true
    }
}

fn parse_reference(line: &str) -> Option<(String, LinkReference)> {
    let rest = line.strip_prefix('[')?;
    let mut escaped = false;
    let mut label_end = None;
    for (i, c) in rest.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' => return None,
            ']' => {
                label_end = Some(i);
                break;
            }
            _ => {}
        }
    }
    let label_end = label_end?;
    let label = util::normalize_label(&rest[..label_end]);
    if label.is_empty() || label_end > 999 {
        return None;
    }

    let rest = rest[label_end + 1..].strip_prefix(':')?.trim_start();
    let (href, used) = util::parse_link_destination(rest)?;
    let after_dest = &rest[used..];
    let trimmed = after_dest.trim_start();
    if trimmed.is_empty() {
        return Some((label, LinkReference { href, title: None }));
    }
    if trimmed.len() == after_dest.len() {
        return None;
    }
    let (title, used) = util::parse_link_title(trimmed)?;
    if !trimmed[used..].trim().is_empty() {
        return None;
    }
    Some((
        label,
        LinkReference {
            href,
            title: Some(title),
        },
    ))
}

/// How a raw HTML block ends.
#[derive(Clone, Copy)]
enum HtmlEnd {
    /// At the first line containing the marker (inclusive).
    Marker(&'static str),
    /// At the first blank line (exclusive).
    BlankLine,
}

static HTML_RAW_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^<(script|pre|style|textarea)(?:\s|>|$)")
        .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

static HTML_BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^</?(address|article|aside|base|basefont|blockquote|body|caption|center|col|colgroup|dd|details|dialog|dir|div|dl|dt|fieldset|figcaption|figure|footer|form|frame|frameset|h[1-6]|head|header|hr|html|iframe|legend|li|link|main|menu|menuitem|nav|noframes|ol|optgroup|option|p|param|search|section|summary|table|tbody|td|tfoot|th|thead|title|tr|track|ul)(?:\s|/?>|$)",
    )
    .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

fn html_block_start(line: &str, interrupting: bool) -> Option<HtmlEnd> {
    if let Some(caps) = HTML_RAW_TEXT.captures(line) {
        let end = match caps[1].to_ascii_lowercase().as_str() {
            "script" => "</script>",
            "pre" => "</pre>",
            "style" => "</style>",
            _ => "</textarea>",
        };
        return Some(HtmlEnd::Marker(end));
    }
    if line.starts_with("<!--") {
        return Some(HtmlEnd::Marker("-->"));
    }
    if line.starts_with("<?") {
        return Some(HtmlEnd::Marker("?>"));
    }
    if line.starts_with("<![CDATA[") {
        return Some(HtmlEnd::Marker("]]>"));
    }
    if line.starts_with("<!") && line[2..].starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Some(HtmlEnd::Marker(">"));
    }
    if HTML_BLOCK_TAG.is_match(line) {
        return Some(HtmlEnd::BlankLine);
    }
    if !interrupting && HTML_LONE_TAG.is_match(line) {
        return Some(HtmlEnd::BlankLine);
    }
    None
}

/// Raw HTML block, recognized only when raw HTML is enabled.
pub(crate) struct HtmlBlockRule;

impl BlockRule for HtmlBlockRule {
    fn name(&self) -> &str {
        "html_block"
    }

    fn interrupts_paragraph(&self) -> bool {
        true
    }

    fn apply(&self, state: &mut BlockState<'_, '_>, silent: bool) -> bool {
        if !state.options.raw_html {
            return false;
        }
        let start = state.line;
        if state.indent(start) >= 4 {
            return false;
        }
        let first = state.line_str(start).trim_start();
        let Some(end) = html_block_start(first, state.interrupting) else {
            return false;
        };
        if silent {
            return true;
        }

        let mut next = start;
        match end {
            HtmlEnd::Marker(marker) => {
                // The closing marker may sit on the opening line itself.
                while next < state.line_max {
                    let found = state.line_str(next).contains(marker);
                    next += 1;
                    if found {
                        break;
                    }
                }
            }
            HtmlEnd::BlankLine => {
                while next < state.line_max && !state.is_blank(next) {
                    next += 1;
                }
            }
        }

        let mut content = String::new();
        for n in start..next {
            content.push_str(state.line_str(n));
            content.push('\n');
        }

        let id = state.push("html_block", "", Nesting::SelfClosing);
        let token = state.token_mut(id);
        token.content = content;
        token.raw = true;
        state.set_map(id, start, next);
        state.line = next;
        true
    }
}
