//! GFM pipe tables.

use super::{BlockRule, BlockState, indent_of};
use crate::token::Nesting;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Align {
    None,
    Left,
    Center,
    Right,
}

impl Align {
    fn style(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Left => Some("text-align:left"),
            Self::Center => Some("text-align:center"),
            Self::Right => Some("text-align:right"),
        }
    }
}

/// Split a table row into trimmed cells.
///
/// Leading and trailing pipes are optional; `\|` does not split.
fn split_row(line: &str) -> Vec<&str> {
    let mut row = line.trim();
    if let Some(rest) = row.strip_prefix('|') {
        row = rest;
    }
    if row.ends_with('|') && !row.ends_with("\\|") {
        row = &row[..row.len() - 1];
    }

    let mut cells = Vec::new();
    let mut cell_start = 0;
    let mut escaped = false;
    for (i, c) in row.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '|' => {
                cells.push(row[cell_start..i].trim());
                cell_start = i + 1;
            }
            _ => {}
        }
    }
    cells.push(row[cell_start..].trim());
    cells
}

fn parse_alignments(line: &str) -> Option<Vec<Align>> {
    if !line.contains(['|', ':']) && !line.trim().starts_with('-') {
        return None;
    }
    split_row(line)
        .into_iter()
        .map(|cell| {
            let left = cell.starts_with(':');
            let right = cell.ends_with(':');
            let dashes = cell.trim_start_matches(':').trim_end_matches(':');
            if dashes.is_empty() || !dashes.chars().all(|c| c == '-') {
                return None;
            }
            Some(match (left, right) {
                (true, true) => Align::Center,
                (true, false) => Align::Left,
                (false, true) => Align::Right,
                (false, false) => Align::None,
            })
        })
        .collect()
}

/// Table with a header row, a delimiter row and optional body rows.
pub(crate) struct TableRule;

impl TableRule {
    fn push_row(
        state: &mut BlockState<'_, '_>,
        cells: &[&str],
        aligns: &[Align],
        cell_kind: &'static str,
        line: usize,
    ) {
        let tag = if cell_kind == "th" { "th" } else { "td" };
        let row = state.push("tr", "tr", Nesting::Open);
        state.set_map(row, line, line + 1);
        for (i, align) in aligns.iter().enumerate() {
            let open = state.push(cell_kind, tag, Nesting::Open);
            if let Some(style) = align.style() {
                state.token_mut(open).attrs.set("style", style);
            }
            let content = cells.get(i).copied().unwrap_or("");
            state.push_inline(content, line, line + 1);
            state.push(cell_kind, tag, Nesting::Close);
        }
        state.push("tr", "tr", Nesting::Close);
    }
}

impl BlockRule for TableRule {
    fn name(&self) -> &str {
        "table"
    }

    fn interrupts_paragraph(&self) -> bool {
        true
    }

    fn apply(&self, state: &mut BlockState<'_, '_>, silent: bool) -> bool {
        let start = state.line;
        if start + 1 >= state.line_max {
            return false;
        }
        let header_line = state.line_str(start);
        let delimiter_line = state.line_str(start + 1);
        if indent_of(header_line) >= 4 || indent_of(delimiter_line) >= 4 {
            return false;
        }
        if !header_line.contains('|') {
            return false;
        }
        let Some(aligns) = parse_alignments(delimiter_line) else {
            return false;
        };
        let header = split_row(header_line);
        if header.len() != aligns.len() {
            return false;
        }
        if silent {
            return true;
        }

        let table = state.push("table", "table", Nesting::Open);
        let thead = state.push("thead", "thead", Nesting::Open);
        state.set_map(thead, start, start + 1);
        Self::push_row(state, &header, &aligns, "th", start);
        state.push("thead", "thead", Nesting::Close);

        let mut next = start + 2;
        let mut tbody = None;
        while next < state.line_max && !state.is_blank(next) {
            if state.interrupts_paragraph(next) {
                break;
            }
            if tbody.is_none() {
                tbody = Some(state.push("tbody", "tbody", Nesting::Open));
            }
            let cells = split_row(state.line_str(next));
            Self::push_row(state, &cells, &aligns, "td", next);
            next += 1;
        }
        if let Some(body) = tbody {
            state.set_map(body, start + 2, next);
            state.push("tbody", "tbody", Nesting::Close);
        }

        state.push("table", "table", Nesting::Close);
        state.set_map(table, start, next);
        state.line = next;
        true
    }
}
