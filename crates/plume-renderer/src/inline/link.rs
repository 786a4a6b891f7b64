//! Links and images: inline `[text](dest "title")`, full `[text][label]`,
//! collapsed `[text][]` and shortcut `[text]` references.

use super::delimited::{find_code_span_end, marker_run};
use super::{InlineRule, InlineState};
use crate::token::Nesting;
use crate::util::{normalize_label, parse_link_destination, parse_link_title};

/// Byte offset of the `]` closing a label whose text starts at `start`.
fn find_label_end(src: &str, start: usize, end: usize) -> Option<usize> {
    let scope = &src[..end];
    let mut depth = 0usize;
    let mut i = start;
    while i < end {
        let c = scope[i..].chars().next()?;
        match c {
            '\\' => {
                i += 1;
                if let Some(escaped) = scope[i..].chars().next() {
                    i += escaped.len_utf8();
                }
                continue;
            }
            '`' => {
                let run = marker_run(scope, i, '`');
                i = find_code_span_end(src, i + run, end, run).unwrap_or(i + run);
                continue;
            }
            '[' => depth += 1,
            ']' if depth == 0 => return Some(i),
            ']' => depth -= 1,
            _ => {}
        }
        i += c.len_utf8();
    }
    None
}

fn skip_whitespace(src: &str, mut i: usize, end: usize) -> usize {
    while i < end && matches!(src.as_bytes()[i], b' ' | b'\t' | b'\n') {
        i += 1;
    }
    i
}

/// Resolved link target.
struct Target {
    href: String,
    title: Option<String>,
    /// Byte offset just past the consumed syntax.
    end: usize,
}

/// Parse `(dest "title")` starting at `pos`.
fn parse_inline_target(src: &str, pos: usize, end: usize) -> Option<Target> {
    if !src[pos..end].starts_with('(') {
        return None;
    }
    let mut i = skip_whitespace(src, pos + 1, end);
    if src[i..end].starts_with(')') {
        return Some(Target {
            href: String::new(),
            title: None,
            end: i + 1,
        });
    }
    let (href, used) = parse_link_destination(&src[i..end])?;
    i += used;
    let ws_start = i;
    i = skip_whitespace(src, i, end);
    let mut title = None;
    if i > ws_start
        && let Some((parsed, used)) = parse_link_title(&src[i..end])
    {
        title = Some(parsed);
        i = skip_whitespace(src, i + used, end);
    }
    src[i..end].starts_with(')').then_some(Target {
        href,
        title,
        end: i + 1,
    })
}

/// Resolve the target of a label ending at `label_end` (the `]`).
fn parse_target(
    state: &InlineState<'_, '_>,
    label_start: usize,
    label_end: usize,
) -> Option<Target> {
    let src = state.src;
    let after = label_end + 1;
    if let Some(target) = parse_inline_target(src, after, state.pos_max) {
        return Some(target);
    }

    let (label, end) = if src[after..state.pos_max].starts_with('[') {
        let close = src[after + 1..state.pos_max].find(']')? + after + 1;
        let label = &src[after + 1..close];
        if label.contains('[') {
            return None;
        }
        if label.trim().is_empty() {
            (&src[label_start..label_end], close + 1)
        } else {
            (label, close + 1)
        }
    } else {
        (&src[label_start..label_end], after)
    };

    let reference = state.env.reference(&normalize_label(label))?;
    Some(Target {
        href: reference.href.clone(),
        title: reference.title.clone(),
        end,
    })
}

pub(crate) struct LinkRule;

impl InlineRule for LinkRule {
    fn name(&self) -> &str {
        "link"
    }

    fn apply(&self, state: &mut InlineState<'_, '_>) -> bool {
        if state.peek() != Some('[') || state.in_link {
            return false;
        }
        let label_start = state.pos + 1;
        let Some(label_end) = find_label_end(state.src, label_start, state.pos_max) else {
            return false;
        };
        let Some(target) = parse_target(state, label_start, label_end) else {
            return false;
        };

        let open = state.push("link", "a", Nesting::Open);
        let token = state.token_mut(open);
        token.attrs.set("href", target.href);
        if let Some(title) = target.title {
            token.attrs.set("title", title);
        }
        state.in_link = true;
        state.tokenize_range(label_start, label_end);
        state.in_link = false;
        state.push("link", "a", Nesting::Close);
        state.pos = target.end;
        true
    }
}

/// `![alt](src "title")`: a single `image` token whose children hold the
/// parsed alt text.
pub(crate) struct ImageRule;

impl InlineRule for ImageRule {
    fn name(&self) -> &str {
        "image"
    }

    fn apply(&self, state: &mut InlineState<'_, '_>) -> bool {
        if !state.rest().starts_with("![") {
            return false;
        }
        let label_start = state.pos + 2;
        let Some(label_end) = find_label_end(state.src, label_start, state.pos_max) else {
            return false;
        };
        let Some(target) = parse_target(state, label_start, label_end) else {
            return false;
        };

        let src = state.src;
        let alt_source = &src[label_start..label_end];
        let id = state.push("image", "img", Nesting::SelfClosing);
        let token = state.token_mut(id);
        token.attrs.set("src", target.href);
        token.attrs.set("alt", "");
        if let Some(title) = target.title {
            token.attrs.set("title", title);
        }
        token.content = alt_source.to_owned();
        state.tokenize_into(id, label_start, label_end);
        state.pos = target.end;
        true
    }
}
