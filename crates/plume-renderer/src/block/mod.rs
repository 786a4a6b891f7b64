//! Block tokenizer.
//!
//! Scans the input line by line. At each non-blank line the block rules are
//! tried in registry order; the first one that matches consumes one or more
//! lines and emits tokens. The `paragraph` rule always matches, so every line
//! ends up in some token and malformed syntax degrades to paragraph text.
//!
//! Container rules (blockquotes, lists, plugin containers) strip their own
//! prefixes and feed the inner text back through [`BlockState::tokenize_nested`].

mod container;
mod leaf;
mod table;

pub(crate) use container::{BlockquoteRule, ListRule};
pub(crate) use leaf::{
    CodeRule, FenceRule, HeadingRule, HrRule, HtmlBlockRule, LHeadingRule, ParagraphRule,
    ReferenceRule,
};
pub(crate) use table::TableRule;

pub use leaf::detect_fence;

use std::borrow::Cow;

use crate::env::Env;
use crate::options::RenderOptions;
use crate::ruler::{NamedRule, Ruler};
use crate::token::{Nesting, Phase, Token, TokenId, TokenStream};

/// Container nesting limit; deeper containers degrade to paragraph text.
pub const MAX_BLOCK_NESTING: usize = 20;

/// A block-level parsing rule.
///
/// # Example
///
/// ```
/// use plume_renderer::{BlockRule, BlockState, MarkdownEngine, Nesting};
///
/// /// `;;;` on its own line becomes a page break.
/// struct PageBreak;
///
/// impl BlockRule for PageBreak {
///     fn name(&self) -> &str { "page_break" }
///
///     fn apply(&self, state: &mut BlockState<'_, '_>, silent: bool) -> bool {
///         if state.current_line().trim() != ";;;" {
///             return false;
///         }
///         if !silent {
///             let line = state.line;
///             let id = state.push("page_break", "hr", Nesting::SelfClosing);
///             state.token_mut(id).attrs.set("class", "page-break");
///             state.set_map(id, line, line + 1);
///         }
///         state.line += 1;
///         true
///     }
/// }
///
/// let mut engine = MarkdownEngine::new();
/// engine.block_mut().before("hr", Box::new(PageBreak)).unwrap();
/// assert!(engine.render("a\n\n;;;\n").contains(r#"<hr class="page-break">"#));
/// ```
pub trait BlockRule: Send + Sync {
    /// Unique rule name within the block phase.
    fn name(&self) -> &str;

    /// Whether the rule may start on a line that would otherwise continue a
    /// paragraph.
    fn interrupts_paragraph(&self) -> bool {
        false
    }

    /// Try to match at `state.line`.
    ///
    /// On success the rule advances `state.line` past the consumed lines and
    /// returns `true`. In `silent` mode it only reports whether it would
    /// match and must not emit tokens or touch the environment.
    fn apply(&self, state: &mut BlockState<'_, '_>, silent: bool) -> bool;
}

impl NamedRule for dyn BlockRule {
    fn rule_name(&self) -> &str {
        self.name()
    }
}

/// Tokenizer state for one (possibly nested) block source.
pub struct BlockState<'s, 'a> {
    lines: Vec<&'s str>,
    /// Current line.
    pub line: usize,
    /// One past the last line of this source.
    pub line_max: usize,
    line_offset: usize,
    /// Token nesting level.
    pub level: usize,
    /// Container nesting depth.
    pub depth: usize,
    /// Set while answering "would this interrupt a paragraph?".
    pub interrupting: bool,
    rules: &'a Ruler<dyn BlockRule>,
    pub options: &'a RenderOptions,
    pub stream: &'a mut TokenStream,
    pub env: &'a mut Env,
}

impl<'s, 'a> BlockState<'s, 'a> {
    /// Create a state over `src`.
    pub fn new(
        src: &'s str,
        rules: &'a Ruler<dyn BlockRule>,
        options: &'a RenderOptions,
        stream: &'a mut TokenStream,
        env: &'a mut Env,
    ) -> Self {
        let mut lines: Vec<&str> = src.split('\n').collect();
        if src.ends_with('\n') {
            lines.pop();
        }
        let line_max = lines.len();
        Self {
            lines,
            line: 0,
            line_max,
            line_offset: 0,
            level: 0,
            depth: 0,
            interrupting: false,
            rules,
            options,
            stream,
            env,
        }
    }

    /// Text of line `n` (empty past the end).
    #[must_use]
    pub fn line_str(&self, n: usize) -> &'s str {
        if n < self.line_max {
            self.lines[n]
        } else {
            ""
        }
    }

    /// Text of the current line.
    #[must_use]
    pub fn current_line(&self) -> &'s str {
        self.line_str(self.line)
    }

    /// Check whether line `n` is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self, n: usize) -> bool {
        self.line_str(n).trim().is_empty()
    }

    /// Number of leading spaces on line `n`.
    #[must_use]
    pub fn indent(&self, n: usize) -> usize {
        indent_of(self.line_str(n))
    }

    /// Absolute source line of local line `n`.
    #[must_use]
    pub fn absolute_line(&self, n: usize) -> usize {
        self.line_offset + n
    }

    /// Advance past blank lines.
    pub fn skip_blank_lines(&mut self) {
        while self.line < self.line_max && self.is_blank(self.line) {
            self.line += 1;
        }
    }

    /// Push a block token, maintaining the nesting level.
    pub fn push(
        &mut self,
        kind: impl Into<Cow<'static, str>>,
        tag: impl Into<Cow<'static, str>>,
        nesting: Nesting,
    ) -> TokenId {
        if nesting == Nesting::Close {
            self.level = self.level.saturating_sub(1);
        }
        let mut token = Token::new(kind, tag, nesting, Phase::Block);
        token.level = self.level;
        if nesting == Nesting::Open {
            self.level += 1;
        }
        self.stream.push_block(token)
    }

    /// Push an `inline` token carrying text for the inline tokenizer.
    pub fn push_inline(&mut self, content: impl Into<String>, start: usize, end: usize) -> TokenId {
        let id = self.push("inline", "", Nesting::SelfClosing);
        let token = self.stream.get_mut(id);
        token.content = content.into();
        token.block = true;
        self.set_map(id, start, end);
        id
    }

    pub fn token_mut(&mut self, id: TokenId) -> &mut Token {
        self.stream.get_mut(id)
    }

    /// Record the local line range `[start, end)` on a token.
    pub fn set_map(&mut self, id: TokenId, start: usize, end: usize) {
        let offset = self.line_offset;
        self.stream.get_mut(id).map = Some((offset + start, offset + end));
    }

    /// Number of block tokens emitted so far.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.stream.block_len()
    }

    /// Check whether an interrupting rule would start at line `n`.
    pub fn interrupts_paragraph(&mut self, n: usize) -> bool {
        if n >= self.line_max || self.is_blank(n) {
            return false;
        }
        let rules = self.rules;
        let saved_line = self.line;
        let saved_interrupting = self.interrupting;
        self.line = n;
        self.interrupting = true;
        let hit = rules
            .iter()
            .filter(|rule| rule.interrupts_paragraph())
            .any(|rule| rule.apply(self, true));
        self.line = saved_line;
        self.interrupting = saved_interrupting;
        hit
    }

    /// Tokenize `src` as the content of a container opened at local line
    /// `start_line`. Tokens are appended at the current level.
    ///
    /// Returns `false` without emitting anything when the nesting limit is
    /// reached.
    pub fn tokenize_nested(&mut self, src: &str, start_line: usize) -> bool {
        if self.depth >= MAX_BLOCK_NESTING {
            return false;
        }
        let offset = self.line_offset + start_line;
        let mut child = BlockState::new(
            src,
            self.rules,
            self.options,
            &mut *self.stream,
            &mut *self.env,
        );
        child.line_offset = offset;
        child.level = self.level;
        child.depth = self.depth + 1;
        tokenize(&mut child);
        true
    }
}

/// Run the block rules over the whole state.
pub fn tokenize(state: &mut BlockState<'_, '_>) {
    let rules = state.rules;
    loop {
        state.skip_blank_lines();
        if state.line >= state.line_max {
            break;
        }
        let start = state.line;
        let matched = rules.iter().any(|rule| {
            state.line = start;
            rule.apply(state, false) && state.line > start
        });
        if !matched {
            // A rule set without a fallback still has to make progress.
            tracing::trace!(line = start, "No block rule matched; skipping line");
            state.line = start + 1;
        }
    }
}

/// Number of leading spaces.
pub(crate) fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Remove up to `n` leading spaces.
pub(crate) fn strip_indent(line: &str, n: usize) -> &str {
    let indent = indent_of(line).min(n);
    &line[indent..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MarkdownEngine;

    fn kinds(input: &str) -> Vec<String> {
        let engine = MarkdownEngine::new();
        let (stream, _env) = engine.parse(input);
        stream
            .blocks()
            .iter()
            .map(|&id| stream.get(id).kind.to_string())
            .collect()
    }

    #[test]
    fn test_paragraphs_split_on_blank_lines() {
        assert_eq!(
            kinds("one\ntwo\n\nthree"),
            vec![
                "paragraph", "inline", "paragraph", "paragraph", "inline", "paragraph"
            ]
        );
    }

    #[test]
    fn test_heading_interrupts_paragraph() {
        assert_eq!(
            kinds("text\n# Title"),
            vec!["paragraph", "inline", "paragraph", "heading", "inline", "heading"]
        );
    }

    #[test]
    fn test_levels_and_maps() {
        let engine = MarkdownEngine::new();
        let (stream, _env) = engine.parse("> quoted\n\npara");
        let blocks = stream.blocks();
        let quote = stream.get(blocks[0]);
        assert_eq!(quote.kind, "blockquote");
        assert_eq!(quote.level, 0);
        assert_eq!(quote.map, Some((0, 1)));
        let inner = stream.get(blocks[1]);
        assert_eq!(inner.kind, "paragraph");
        assert_eq!(inner.level, 1);
        let para = stream.get(blocks[blocks.len() - 3]);
        assert_eq!(para.map, Some((2, 3)));
    }

    #[test]
    fn test_stream_is_balanced() {
        let engine = MarkdownEngine::new();
        let (stream, _env) = engine.parse("- a\n  > b\n- c\n\n```\nx\n```\n| a |\n|---|\n| 1 |");
        assert!(stream.is_balanced(stream.blocks()));
    }

    #[test]
    fn test_deep_nesting_degrades() {
        let input = ">".repeat(MAX_BLOCK_NESTING + 10) + " deep";
        let html = MarkdownEngine::new().render(&input);
        assert!(html.contains("deep"));
    }

    #[test]
    fn test_strip_indent() {
        assert_eq!(strip_indent("    code", 4), "code");
        assert_eq!(strip_indent("  two", 4), "two");
        assert_eq!(strip_indent("      six", 4), "  six");
    }
}
