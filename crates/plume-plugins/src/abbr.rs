//! Abbreviations: `*[HTML]: Hyper Text Markup Language`.
//!
//! Definitions are block-level lines that produce no output. After inline
//! tokenization, whole-word occurrences of each label in text tokens are
//! wrapped in `<abbr title="...">`. Longer labels are matched first.

use std::collections::HashMap;

use plume_renderer::{
    BlockRule, BlockState, CoreRule, CoreState, MarkdownEngine, Nesting, Phase, Plugin,
    RegistryError, Token, TokenId, TokenStream, unescape,
};
use regex::Regex;

/// The `abbr` plugin.
///
/// # Example
///
/// ```
/// use plume_plugins::AbbrPlugin;
/// use plume_renderer::MarkdownEngine;
///
/// let engine = MarkdownEngine::new().with_plugin(AbbrPlugin)?;
/// assert_eq!(
///     engine.render("*[W3C]: World Wide Web Consortium\nThe W3C site."),
///     "<p>The <abbr title=\"World Wide Web Consortium\">W3C</abbr> site.</p>\n"
/// );
/// # Ok::<(), plume_renderer::RegistryError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AbbrPlugin;

impl Plugin for AbbrPlugin {
    fn name(&self) -> &str {
        "abbr"
    }

    fn register(&self, engine: &mut MarkdownEngine) -> Result<(), RegistryError> {
        engine.block_mut().before("reference", Box::new(AbbrDefinition))?;
        engine.core_mut().before("text_join", Box::new(AbbrReplace))
    }
}

/// Abbreviations defined in the current document. The first definition of
/// a label wins.
#[derive(Debug, Default)]
struct Abbreviations(HashMap<String, String>);

/// Parse `*[label]: title`, returning the unescaped label and the title.
fn parse_definition(line: &str) -> Option<(String, &str)> {
    if line.len() - line.trim_start().len() >= 4 {
        return None;
    }
    let rest = line.trim_start().strip_prefix("*[")?;
    let mut escaped = false;
    let mut label_end = None;
    for (i, c) in rest.char_indices() {
        match c {
            _ if escaped => escaped = false,
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
    let label = &rest[..label_end];
    let title = rest[label_end + 1..].strip_prefix(':')?.trim();
    if label.is_empty() || title.is_empty() {
        return None;
    }
    Some((unescape(label).into_owned(), title))
}

struct AbbrDefinition;

impl BlockRule for AbbrDefinition {
    fn name(&self) -> &str {
        "abbr_def"
    }

    fn interrupts_paragraph(&self) -> bool {
        true
    }

    fn apply(&self, state: &mut BlockState<'_, '_>, silent: bool) -> bool {
        let Some((label, title)) = parse_definition(state.current_line()) else {
            return false;
        };
        if !silent {
            state
                .env
                .get_or_default::<Abbreviations>()
                .0
                .entry(label)
                .or_insert_with(|| title.to_owned());
        }
        state.line += 1;
        true
    }
}

/// Wraps label occurrences in text tokens with `abbr` spans.
struct AbbrReplace;

impl CoreRule for AbbrReplace {
    fn name(&self) -> &str {
        "abbr_replace"
    }

    fn apply(&self, state: &mut CoreState<'_>) {
        let Some(table) = state.env.get::<Abbreviations>().filter(|t| !t.0.is_empty()) else {
            return;
        };
        let mut labels: Vec<&str> = table.0.keys().map(String::as_str).collect();
        labels.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        let alternation = labels
            .iter()
            .map(|label| regex::escape(label))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = match Regex::new(&alternation) {
            Ok(pattern) => pattern,
            Err(e) => {
                tracing::trace!(error = %e, "Abbreviation pattern rejected");
                return;
            }
        };

        for inline in state.inline_tokens() {
            replace_in_children(&mut state.stream, inline, &pattern, &labels, table);
        }
    }
}

fn replace_in_children(
    stream: &mut TokenStream,
    parent: TokenId,
    pattern: &Regex,
    labels: &[&str],
    table: &Abbreviations,
) {
    let children = stream.children(parent).to_vec();
    let mut rebuilt = Vec::with_capacity(children.len());
    let mut changed = false;
    for child in children {
        let token = stream.get(child);
        if token.kind != "text" {
            rebuilt.push(child);
            continue;
        }
        let pieces = split_words(&token.content, pattern, labels);
        if pieces.iter().all(|piece| matches!(piece, Piece::Text(_))) {
            rebuilt.push(child);
            continue;
        }

        changed = true;
        let level = token.level;
        for piece in pieces {
            match piece {
                Piece::Text(text) => {
                    let mut token = Token::new("text", "", Nesting::SelfClosing, Phase::Inline)
                        .with_content(text);
                    token.level = level;
                    rebuilt.push(stream.alloc(token));
                }
                Piece::Abbr(label) => {
                    let title = table.0.get(&label).cloned().unwrap_or_default();
                    let mut open = Token::new("abbr", "abbr", Nesting::Open, Phase::Inline);
                    open.attrs.set("title", title);
                    open.level = level;
                    let mut text = Token::new("text", "", Nesting::SelfClosing, Phase::Inline)
                        .with_content(label);
                    text.level = level + 1;
                    let mut close = Token::new("abbr", "abbr", Nesting::Close, Phase::Inline);
                    close.level = level;
                    rebuilt.push(stream.alloc(open));
                    rebuilt.push(stream.alloc(text));
                    rebuilt.push(stream.alloc(close));
                }
            }
        }
    }
    if changed {
        stream.set_children(parent, rebuilt);
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Piece {
    Text(String),
    Abbr(String),
}

/// Split `text` at whole-word label matches.
///
/// `labels` is sorted longest first; at each candidate position the longest
/// label that ends on a word boundary wins.
fn split_words(text: &str, pattern: &Regex, labels: &[&str]) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut copied = 0;
    let mut search = 0;
    while let Some(found) = pattern.find_at(text, search) {
        let start = found.start();
        let label = if text[..start].chars().next_back().is_some_and(is_word_char) {
            None
        } else {
            labels.iter().copied().find(|&label| {
                text[start..].starts_with(label)
                    && !text[start + label.len()..].chars().next().is_some_and(is_word_char)
            })
        };
        let Some(label) = label else {
            search = start + text[start..].chars().next().map_or(1, char::len_utf8);
            continue;
        };
        if start > copied {
            pieces.push(Piece::Text(text[copied..start].to_owned()));
        }
        pieces.push(Piece::Abbr(label.to_owned()));
        copied = start + label.len();
        search = copied;
    }
    if copied < text.len() {
        pieces.push(Piece::Text(text[copied..].to_owned()));
    }
    pieces
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
