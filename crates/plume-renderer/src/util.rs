//! Shared helpers for tokenizer rules.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Attribute grammar shared by the raw HTML patterns.
const HTML_ATTRIBUTE: &str = r#"(?:\s+[a-zA-Z_:][a-zA-Z0-9_.:-]*(?:\s*=\s*(?:[^"'=<>`\x00-\x20]+|'[^']*'|"[^"]*"))?)"#;

/// Open tag, closing tag, comment, processing instruction, declaration or
/// CDATA section at the start of the input.
pub(crate) static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?:<[A-Za-z][A-Za-z0-9-]*{HTML_ATTRIBUTE}*\s*/?>|</[A-Za-z][A-Za-z0-9-]*\s*>|<!---->|<!--(?:-?[^>-])(?:-?[^-])*-->|<\?[\s\S]*?\?>|<![A-Za-z][^>]*>|<!\[CDATA\[[\s\S]*?\]\]>)"
    ))
    .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// A complete open or closing tag alone on a line.
pub(crate) static HTML_LONE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?:<[A-Za-z][A-Za-z0-9-]*{HTML_ATTRIBUTE}*\s*/?>|</[A-Za-z][A-Za-z0-9-]*\s*>)\s*$"
    ))
    .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// Escape HTML special characters (`&`, `<`, `>`, `"`).
#[must_use]
pub fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    escape_html_into(&mut out, s);
    Cow::Owned(out)
}

/// Escape HTML special characters, appending to `out`.
pub fn escape_html_into(out: &mut String, s: &str) {
    let mut last = 0;
    for (i, c) in s.char_indices() {
        let replacement = match c {
            '&' => "&amp;",
            '<' => "&lt;",
            '>' => "&gt;",
            '"' => "&quot;",
            _ => continue,
        };
        out.push_str(&s[last..i]);
        out.push_str(replacement);
        last = i + 1;
    }
    out.push_str(&s[last..]);
}

/// Check for ASCII punctuation (the characters a backslash may escape).
#[must_use]
pub fn is_ascii_punct(c: char) -> bool {
    c.is_ascii_punctuation()
}

/// Resolve backslash escapes of ASCII punctuation.
#[must_use]
pub fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('\\') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(&next) = chars.peek()
            && is_ascii_punct(next)
        {
            out.push(next);
            chars.next();
            continue;
        }
        out.push(c);
    }
    Cow::Owned(out)
}

/// Normalize a link reference label: trim, collapse whitespace, lowercase.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Convert text to a URL-safe slug.
///
/// Lowercases, turns whitespace, dashes and underscores into single dashes
/// and drops other non-alphanumeric characters.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut result = String::new();
    let mut last_was_dash = true;

    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            result.extend(c.to_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && (c.is_whitespace() || c == '-' || c == '_') {
            result.push('-');
            last_was_dash = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}

/// Parse a link destination at the start of `s`.
///
/// Accepts `<...>` or a run of non-space characters with balanced
/// parentheses. Returns the unescaped destination and bytes consumed.
pub(crate) fn parse_link_destination(s: &str) -> Option<(String, usize)> {
    if let Some(rest) = s.strip_prefix('<') {
        let mut escaped = false;
        for (i, c) in rest.char_indices() {
            match c {
                '\n' | '<' if !escaped => return None,
                '>' if !escaped => return Some((unescape(&rest[..i]).into_owned(), i + 2)),
                '\\' if !escaped => {
                    escaped = true;
                    continue;
                }
                _ => {}
            }
            escaped = false;
        }
        return None;
    }

    let mut depth = 0usize;
    let mut end = s.len();
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '(' => depth += 1,
            ')' if depth == 0 => {
                end = i;
                break;
            }
            ')' => depth -= 1,
            c if c.is_whitespace() || c.is_control() => {
                end = i;
                break;
            }
            _ => {}
        }
    }
    if end == 0 || depth != 0 {
        return None;
    }
    Some((unescape(&s[..end]).into_owned(), end))
}

/// Parse a link title (`"..."`, `'...'` or `(...)`) at the start of `s`.
pub(crate) fn parse_link_title(s: &str) -> Option<(String, usize)> {
    let open = s.chars().next()?;
    let close = match open {
        '"' => '"',
        '\'' => '\'',
        '(' => ')',
        _ => return None,
    };
    let mut escaped = false;
    for (i, c) in s[1..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
        } else if c == close {
            return Some((unescape(&s[1..=i]).into_owned(), i + 2));
        } else if open == '(' && c == '(' {
            return None;
        }
    }
    None
}

/// Decode a named or numeric character reference body (without `&`/`;`).
pub(crate) fn decode_entity(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = if let Some(hex) = num.strip_prefix(['x', 'X']) {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            num.parse::<u32>().ok()?
        };
        let c = match code {
            0 => '\u{FFFD}',
            _ => char::from_u32(code).unwrap_or('\u{FFFD}'),
        };
        return Some(c.to_string());
    }
    let decoded = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "copy" => "©",
        "reg" => "®",
        "trade" => "™",
        "hellip" => "…",
        "mdash" => "—",
        "ndash" => "–",
        "laquo" => "«",
        "raquo" => "»",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "times" => "×",
        "divide" => "÷",
        "deg" => "°",
        "plusmn" => "±",
        "middot" => "·",
        "sect" => "§",
        "para" => "¶",
        "euro" => "€",
        "pound" => "£",
        "yen" => "¥",
        "cent" => "¢",
        "larr" => "←",
        "rarr" => "→",
        "uarr" => "↑",
        "darr" => "↓",
        _ => return None,
    };
    Some(decoded.to_owned())
}
