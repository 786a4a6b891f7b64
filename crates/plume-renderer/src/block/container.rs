//! Container block rules: blockquotes and lists.

use super::{BlockRule, BlockState, MAX_BLOCK_NESTING, indent_of, strip_indent};
use crate::token::Nesting;

/// Text after a `>` marker, with one optional following space removed.
fn strip_quote_marker(line: &str) -> Option<&str> {
    if indent_of(line) >= 4 {
        return None;
    }
    let rest = line.trim_start().strip_prefix('>')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Blockquote: lines prefixed with `>`, plus lazy paragraph continuations.
pub(crate) struct BlockquoteRule;

impl BlockRule for BlockquoteRule {
    fn name(&self) -> &str {
        "blockquote"
    }

    fn interrupts_paragraph(&self) -> bool {
        true
    }

    fn apply(&self, state: &mut BlockState<'_, '_>, silent: bool) -> bool {
        let start = state.line;
        let Some(first) = strip_quote_marker(state.line_str(start)) else {
            return false;
        };
        if silent {
            return true;
        }
        if state.depth >= MAX_BLOCK_NESTING {
            return false;
        }

        let mut inner = vec![first];
        let mut next = start + 1;
        while next < state.line_max {
            if let Some(rest) = strip_quote_marker(state.line_str(next)) {
                inner.push(rest);
                next += 1;
                continue;
            }
            if state.is_blank(next) {
                break;
            }
            let lazy = inner.last().is_some_and(|prev| !prev.trim().is_empty())
                && !state.interrupts_paragraph(next);
            if !lazy {
                break;
            }
            inner.push(state.line_str(next));
            next += 1;
        }

        let src = inner.join("\n");
        let open = state.push("blockquote", "blockquote", Nesting::Open);
        state.token_mut(open).markup = ">".to_owned();
        state.set_map(open, start, next);
        state.tokenize_nested(&src, start);
        let close = state.push("blockquote", "blockquote", Nesting::Close);
        state.token_mut(close).markup = ">".to_owned();
        state.line = next;
        true
    }
}

/// A parsed list item marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Marker {
    ordered: bool,
    /// Bullet character, or the delimiter (`.`/`)`) of an ordered marker.
    symbol: char,
    start: u64,
    /// Byte offset just past the marker.
    end: usize,
}

impl Marker {
    fn parse(line: &str) -> Option<Self> {
        let indent = indent_of(line);
        if indent >= 4 {
            return None;
        }
        let rest = &line[indent..];
        let first = rest.chars().next()?;

        let (ordered, symbol, start, len) = if matches!(first, '-' | '+' | '*') {
            (false, first, 1, 1)
        } else {
            let digits = rest.chars().take_while(char::is_ascii_digit).count();
            if digits == 0 || digits > 9 {
                return None;
            }
            let delim = rest[digits..].chars().next()?;
            if delim != '.' && delim != ')' {
                return None;
            }
            let start = rest[..digits].parse().ok()?;
            (true, delim, start, digits + 1)
        };

        let after = &rest[len..];
        if !after.is_empty() && !after.starts_with([' ', '\t']) {
            return None;
        }
        Some(Self {
            ordered,
            symbol,
            start,
            end: indent + len,
        })
    }

    fn same_list(&self, other: &Self) -> bool {
        self.ordered == other.ordered && self.symbol == other.symbol
    }

    /// Column where the item's content starts.
    fn content_column(&self, line: &str) -> usize {
        let after = &line[self.end..];
        let spaces = indent_of(after);
        if after.trim().is_empty() || spaces > 4 {
            self.end + 1
        } else {
            self.end + spaces
        }
    }
}

/// Bullet (`-`, `+`, `*`) and ordered (`1.`, `1)`) lists.
///
/// A list is loose when its items are separated by blank lines or an item
/// contains blank lines between blocks; tight lists hide the paragraphs of
/// their items.
pub(crate) struct ListRule;

impl BlockRule for ListRule {
    fn name(&self) -> &str {
        "list"
    }

    fn interrupts_paragraph(&self) -> bool {
        true
    }

    fn apply(&self, state: &mut BlockState<'_, '_>, silent: bool) -> bool {
        let start = state.line;
        let Some(first_marker) = Marker::parse(state.line_str(start)) else {
            return false;
        };
        if state.interrupting {
            let empty = state.line_str(start)[first_marker.end..].trim().is_empty();
            if empty || (first_marker.ordered && first_marker.start != 1) {
                return false;
            }
        }
        if silent {
            return true;
        }
        if state.depth >= MAX_BLOCK_NESTING {
            return false;
        }

        let (kind, tag) = if first_marker.ordered {
            ("ordered_list", "ol")
        } else {
            ("bullet_list", "ul")
        };
        let list_level = state.level;
        let first_token = state.token_count();
        let open = state.push(kind, tag, Nesting::Open);
        state.token_mut(open).markup = first_marker.symbol.to_string();
        if first_marker.ordered && first_marker.start != 1 {
            state.token_mut(open).attrs.set("start", first_marker.start.to_string());
        }

        let mut tight = true;
        let mut marker = first_marker;
        let mut item_start = start;
        let list_end = loop {
            let line = state.line_str(item_start);
            let column = marker.content_column(line);
            let mut inner = vec![line.get(column..).unwrap_or("")];
            let mut next = item_start + 1;
            while next < state.line_max {
                if state.is_blank(next) {
                    inner.push("");
                    next += 1;
                    continue;
                }
                let text = state.line_str(next);
                if indent_of(text) >= column {
                    inner.push(strip_indent(text, column));
                    next += 1;
                    continue;
                }
                let lazy = inner.last().is_some_and(|prev| !prev.trim().is_empty())
                    && Marker::parse(text).is_none()
                    && !state.interrupts_paragraph(next);
                if !lazy {
                    break;
                }
                inner.push(text.trim_start());
                next += 1;
            }

            let mut trailing = 0;
            while inner.len() > 1 && inner.last().is_some_and(|l| l.trim().is_empty()) {
                inner.pop();
                trailing += 1;
            }
            if inner.iter().skip(1).any(|l| l.trim().is_empty()) {
                tight = false;
            }
            let item_end = next - trailing;

            let item = state.push("list_item", "li", Nesting::Open);
            state.token_mut(item).markup = marker.symbol.to_string();
            state.set_map(item, item_start, item_end);
            state.tokenize_nested(&inner.join("\n"), item_start);
            state.push("list_item", "li", Nesting::Close);

            let sibling = (next < state.line_max)
                .then(|| Marker::parse(state.line_str(next)))
                .flatten()
                .filter(|m| m.same_list(&first_marker));
            match sibling {
                Some(m) => {
                    if trailing > 0 {
                        tight = false;
                    }
                    marker = m;
                    item_start = next;
                }
                None => break item_end,
            }
        };

        state.push(kind, tag, Nesting::Close);
        state.set_map(open, start, list_end);

        if tight {
            let paragraphs: Vec<_> = state.stream.blocks()[first_token..]
                .iter()
                .copied()
                .filter(|&id| {
                    let token = state.stream.get(id);
                    token.kind == "paragraph" && token.level == list_level + 2
                })
                .collect();
            for id in paragraphs {
                state.token_mut(id).hidden = true;
            }
        }

        state.line = list_end;
        true
    }
}
