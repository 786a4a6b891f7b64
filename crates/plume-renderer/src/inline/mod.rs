//! Inline tokenizer.
//!
//! Scans the content of one block-level `inline` token. At each position the
//! inline rules are tried in registry order; the first one that matches
//! consumes its span and emits tokens into the parent's `children`. A
//! character no rule claims is added to the pending text run, which is
//! flushed as a single `text` token before the next emitted token.

mod delimited;
mod link;
mod rules;

pub use delimited::{DelimitedRule, EmphasisRule, find_closer, marker_run};
pub(crate) use link::{ImageRule, LinkRule};
pub(crate) use rules::{
    AutolinkRule, BackticksRule, EntityRule, EscapeRule, HtmlInlineRule, NewlineRule, TextRule,
};

use std::borrow::Cow;

use crate::env::Env;
use crate::options::RenderOptions;
use crate::ruler::{NamedRule, Ruler};
use crate::token::{Nesting, Phase, Token, TokenId, TokenStream};

/// Span nesting limit; deeper content stays literal.
pub const MAX_INLINE_NESTING: usize = 20;

/// An inline parsing rule.
///
/// # Example
///
/// ```
/// use plume_renderer::{InlineRule, InlineState, MarkdownEngine, Nesting};
///
/// /// `:smile:` becomes an emoji span.
/// struct Smile;
///
/// impl InlineRule for Smile {
///     fn name(&self) -> &str { "smile" }
///
///     fn apply(&self, state: &mut InlineState<'_, '_>) -> bool {
///         if !state.rest().starts_with(":smile:") {
///             return false;
///         }
///         let id = state.push("emoji", "span", Nesting::SelfClosing);
///         state.token_mut(id).content = "\u{1F604}".to_owned();
///         state.pos += ":smile:".len();
///         true
///     }
/// }
///
/// let mut engine = MarkdownEngine::new();
/// engine.inline_mut().before("emphasis", Box::new(Smile)).unwrap();
/// engine.renderer_mut().set_fn("emoji", |ctx, tokens, idx, out| {
///     out.push_str(&ctx.stream().get(tokens[idx]).content);
/// });
/// assert_eq!(engine.render("hi :smile:"), "<p>hi \u{1F604}</p>\n");
/// ```
pub trait InlineRule: Send + Sync {
    /// Unique rule name within the inline phase.
    fn name(&self) -> &str;

    /// Try to match at `state.pos`.
    ///
    /// On success the rule advances `state.pos` past the consumed input and
    /// returns `true`. On failure it must leave the state untouched.
    fn apply(&self, state: &mut InlineState<'_, '_>) -> bool;

    /// Characters this rule can start on.
    ///
    /// The built-in `text` rule skips plain runs and only stops where some
    /// rule may match. Punctuation used by the built-in syntax always stops
    /// it; a rule starting on any other character must list it here.
    fn triggers(&self) -> &[char] {
        &[]
    }
}

impl NamedRule for dyn InlineRule {
    fn rule_name(&self) -> &str {
        self.name()
    }
}

/// Tokenizer state for the content of one `inline` token.
pub struct InlineState<'s, 'a> {
    /// Full inline source.
    pub src: &'s str,
    /// Current byte position.
    pub pos: usize,
    /// End of the range being tokenized.
    pub pos_max: usize,
    /// Token nesting level within the children list.
    pub level: usize,
    /// Span nesting depth.
    pub depth: usize,
    /// Set while tokenizing a link label.
    pub in_link: bool,
    pending: String,
    parent: TokenId,
    rules: &'a Ruler<dyn InlineRule>,
    triggers: Vec<char>,
    pub options: &'a RenderOptions,
    pub stream: &'a mut TokenStream,
    pub env: &'a mut Env,
}

impl<'s, 'a> InlineState<'s, 'a> {
    /// Create a state emitting into the children of `parent`.
    pub fn new(
        src: &'s str,
        parent: TokenId,
        rules: &'a Ruler<dyn InlineRule>,
        options: &'a RenderOptions,
        stream: &'a mut TokenStream,
        env: &'a mut Env,
    ) -> Self {
        let mut triggers: Vec<char> = rules
            .iter()
            .flat_map(|rule| rule.triggers().iter().copied())
            .filter(|&c| !self::rules::is_terminator(c))
            .collect();
        triggers.sort_unstable();
        triggers.dedup();
        Self {
            src,
            pos: 0,
            pos_max: src.len(),
            level: 0,
            depth: 0,
            in_link: false,
            pending: String::new(),
            parent,
            rules,
            triggers,
            options,
            stream,
            env,
        }
    }

    /// Whether a rule may start on `c`.
    #[must_use]
    pub fn is_trigger(&self, c: char) -> bool {
        rules::is_terminator(c) || self.triggers.contains(&c)
    }

    /// Unconsumed input up to the end of the current range.
    #[must_use]
    pub fn rest(&self) -> &'s str {
        &self.src[self.pos..self.pos_max]
    }

    /// Character at the current position.
    #[must_use]
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Character just before the current position.
    #[must_use]
    pub fn prev_char(&self) -> Option<char> {
        self.src[..self.pos].chars().next_back()
    }

    /// Add literal text to the pending run.
    pub fn push_pending(&mut self, text: &str) {
        self.pending.push_str(text);
    }

    /// Pending text not yet emitted.
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Mutable pending text (for trimming before breaks).
    pub fn pending_mut(&mut self) -> &mut String {
        &mut self.pending
    }

    /// Emit the pending run as a `text` token.
    pub fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let mut token = Token::new("text", "", Nesting::SelfClosing, Phase::Inline);
        token.content = std::mem::take(&mut self.pending);
        token.level = self.level;
        self.stream.push_child(self.parent, token);
    }

    /// Push an inline token, flushing pending text first.
    pub fn push(
        &mut self,
        kind: impl Into<Cow<'static, str>>,
        tag: impl Into<Cow<'static, str>>,
        nesting: Nesting,
    ) -> TokenId {
        self.flush_pending();
        if nesting == Nesting::Close {
            self.level = self.level.saturating_sub(1);
        }
        let mut token = Token::new(kind, tag, nesting, Phase::Inline);
        token.level = self.level;
        if nesting == Nesting::Open {
            self.level += 1;
        }
        self.stream.push_child(self.parent, token)
    }

    /// Push a `text_special` token: text that must not be re-parsed (escapes,
    /// entities) and is merged into plain text after tokenization.
    pub fn push_text_special(&mut self, content: impl Into<String>, markup: impl Into<String>) {
        let id = self.push("text_special", "", Nesting::SelfClosing);
        let token = self.stream.get_mut(id);
        token.content = content.into();
        token.markup = markup.into();
    }

    pub fn token_mut(&mut self, id: TokenId) -> &mut Token {
        self.stream.get_mut(id)
    }

    /// Tokenize `[start, end)` into the current children list.
    ///
    /// Past the nesting limit the range is kept as literal text.
    pub fn tokenize_range(&mut self, start: usize, end: usize) {
        if self.depth >= MAX_INLINE_NESTING {
            tracing::trace!(depth = self.depth, "Inline nesting limit reached");
            let literal = &self.src[start..end];
            self.pending.push_str(literal);
            return;
        }
        let (saved_pos, saved_max) = (self.pos, self.pos_max);
        self.pos = start;
        self.pos_max = end;
        self.depth += 1;
        tokenize(self);
        self.depth -= 1;
        self.pos = saved_pos;
        self.pos_max = saved_max;
    }

    /// Tokenize `[start, end)` into the children of another token (image alt
    /// text).
    pub fn tokenize_into(&mut self, parent: TokenId, start: usize, end: usize) {
        self.flush_pending();
        let saved_parent = std::mem::replace(&mut self.parent, parent);
        let saved_level = std::mem::replace(&mut self.level, 0);
        self.tokenize_range(start, end);
        self.flush_pending();
        self.parent = saved_parent;
        self.level = saved_level;
    }
}

/// Run the inline rules over `[state.pos, state.pos_max)`.
pub fn tokenize(state: &mut InlineState<'_, '_>) {
    let rules = state.rules;
    while state.pos < state.pos_max {
        let start = state.pos;
        let matched = rules.iter().any(|rule| {
            state.pos = start;
            rule.apply(state) && state.pos > start
        });
        if !matched {
            state.pos = start;
            if let Some(c) = state.peek() {
                state.pending.push(c);
                state.pos += c.len_utf8();
            }
        }
    }
    state.flush_pending();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MarkdownEngine;
    use pretty_assertions::assert_eq;

    fn children(input: &str) -> Vec<(String, String)> {
        let (stream, _env) = MarkdownEngine::new().parse(input);
        let inline = stream.blocks()[1];
        stream
            .children(inline)
            .iter()
            .map(|&id| {
                let token = stream.get(id);
                (token.kind.to_string(), token.content.clone())
            })
            .collect()
    }

    #[test]
    fn test_plain_text_is_one_token() {
        assert_eq!(
            children("just some text"),
            vec![("text".to_owned(), "just some text".to_owned())]
        );
    }

    #[test]
    fn test_unmatched_markers_join_text() {
        // `text_join` merges adjacent text after tokenization.
        assert_eq!(
            children("a * b _ c"),
            vec![("text".to_owned(), "a * b _ c".to_owned())]
        );
    }

    #[test]
    fn test_children_balanced() {
        let (stream, _env) = MarkdownEngine::new().parse("*a **b** [c](d)* `e`");
        let inline = stream.blocks()[1];
        assert!(stream.is_balanced(stream.children(inline)));
    }

    #[test]
    fn test_rule_on_custom_character() {
        let mut engine = MarkdownEngine::new();
        engine
            .inline_mut()
            .before("emphasis", Box::new(DelimitedRule::new("kbd", '|', 2)))
            .unwrap();
        assert_eq!(engine.render("||x||"), "<p><kbd>x</kbd></p>\n");
        assert_eq!(
            engine.render("press ||Ctrl|| now"),
            "<p>press <kbd>Ctrl</kbd> now</p>\n"
        );
        assert_eq!(MarkdownEngine::new().render("a||x||"), "<p>a||x||</p>\n");
    }

    #[test]
    fn test_deep_inline_nesting_stays_total() {
        let input = "*a ".repeat(MAX_INLINE_NESTING + 5) + &" a*".repeat(MAX_INLINE_NESTING + 5);
        let html = MarkdownEngine::new().render(&input);
        assert!(html.starts_with("<p>"));
    }
}
