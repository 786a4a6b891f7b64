//! Core phase: whole-document passes.
//!
//! The built-in chain is `normalize` → `block` → `inline` → `text_join`.
//! Plugins insert post-processing passes (attribute attachment,
//! abbreviations, heading anchors) relative to these names.

use crate::block::{self, BlockRule, BlockState};
use crate::env::Env;
use crate::inline::{self, InlineRule, InlineState};
use crate::options::RenderOptions;
use crate::ruler::{NamedRule, Ruler};
use crate::token::{Nesting, TokenId, TokenStream};

/// A whole-document pass.
pub trait CoreRule: Send + Sync {
    /// Unique rule name within the core phase.
    fn name(&self) -> &str;

    fn apply(&self, state: &mut CoreState<'_>);
}

impl NamedRule for dyn CoreRule {
    fn rule_name(&self) -> &str {
        self.name()
    }
}

/// State threaded through the core rules of one render.
pub struct CoreState<'a> {
    /// Source text (rewritten in place by `normalize`).
    pub src: String,
    pub stream: TokenStream,
    pub env: Env,
    pub options: &'a RenderOptions,
    block_rules: &'a Ruler<dyn BlockRule>,
    inline_rules: &'a Ruler<dyn InlineRule>,
}

impl<'a> CoreState<'a> {
    pub fn new(
        src: String,
        options: &'a RenderOptions,
        block_rules: &'a Ruler<dyn BlockRule>,
        inline_rules: &'a Ruler<dyn InlineRule>,
    ) -> Self {
        Self {
            src,
            stream: TokenStream::new(),
            env: Env::new(),
            options,
            block_rules,
            inline_rules,
        }
    }

    /// Block rules of the engine running this render.
    #[must_use]
    pub fn block_rules(&self) -> &'a Ruler<dyn BlockRule> {
        self.block_rules
    }

    /// Inline rules of the engine running this render.
    #[must_use]
    pub fn inline_rules(&self) -> &'a Ruler<dyn InlineRule> {
        self.inline_rules
    }

    /// Ids of all block-level `inline` tokens, in document order.
    #[must_use]
    pub fn inline_tokens(&self) -> Vec<TokenId> {
        self.stream
            .blocks()
            .iter()
            .copied()
            .filter(|&id| self.stream.get(id).kind == "inline")
            .collect()
    }

    pub(crate) fn into_parts(self) -> (TokenStream, Env) {
        (self.stream, self.env)
    }
}

/// Unify line endings, replace NUL and expand leading tabs to 4-column stops.
pub(crate) struct NormalizeRule;

impl CoreRule for NormalizeRule {
    fn name(&self) -> &str {
        "normalize"
    }

    fn apply(&self, state: &mut CoreState<'_>) {
        let src = state.src.replace("\r\n", "\n").replace('\r', "\n");
        let mut out = String::with_capacity(src.len());
        for (i, line) in src.split('\n').enumerate() {
            if i > 0 {
                out.push('\n');
            }
            expand_leading_tabs(line, &mut out);
        }
        state.src = out.replace('\0', "\u{FFFD}");
    }
}

fn expand_leading_tabs(line: &str, out: &mut String) {
    let mut column = 0;
    for (i, c) in line.char_indices() {
        match c {
            ' ' => {
                out.push(' ');
                column += 1;
            }
            '\t' => {
                let width = 4 - column % 4;
                out.extend(std::iter::repeat_n(' ', width));
                column += width;
            }
            _ => {
                out.push_str(&line[i..]);
                return;
            }
        }
    }
}

/// Run the block tokenizer over the source.
pub(crate) struct BlockPass;

impl CoreRule for BlockPass {
    fn name(&self) -> &str {
        "block"
    }

    fn apply(&self, state: &mut CoreState<'_>) {
        let mut block_state = BlockState::new(
            &state.src,
            state.block_rules,
            state.options,
            &mut state.stream,
            &mut state.env,
        );
        block::tokenize(&mut block_state);
    }
}

/// Run the inline tokenizer over every `inline` token.
pub(crate) struct InlinePass;

impl CoreRule for InlinePass {
    fn name(&self) -> &str {
        "inline"
    }

    fn apply(&self, state: &mut CoreState<'_>) {
        for id in state.inline_tokens() {
            let content = state.stream.get(id).content.clone();
            let mut inline_state = InlineState::new(
                &content,
                id,
                state.inline_rules,
                state.options,
                &mut state.stream,
                &mut state.env,
            );
            inline::tokenize(&mut inline_state);
        }
    }
}

/// Turn `text_special` into `text` and merge adjacent text tokens.
pub(crate) struct TextJoin;

impl CoreRule for TextJoin {
    fn name(&self) -> &str {
        "text_join"
    }

    fn apply(&self, state: &mut CoreState<'_>) {
        for id in state.inline_tokens() {
            join_text(&mut state.stream, id);
        }
    }
}

fn join_text(stream: &mut TokenStream, parent: TokenId) {
    let children = stream.children(parent).to_vec();
    let mut joined: Vec<TokenId> = Vec::with_capacity(children.len());
    for id in children {
        if !stream.get(id).children.is_empty() {
            join_text(stream, id);
        }
        let token = stream.get_mut(id);
        if token.kind == "text_special" {
            token.kind = "text".into();
        }
        let is_text = token.kind == "text" && token.nesting == Nesting::SelfClosing;
        if is_text
            && let Some(&last) = joined.last()
            && stream.get(last).kind == "text"
        {
            let content = std::mem::take(&mut stream.get_mut(id).content);
            stream.get_mut(last).content.push_str(&content);
            continue;
        }
        joined.push(id);
    }
    stream.set_children(parent, joined);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MarkdownEngine;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_expand_leading_tabs() {
        let mut out = String::new();
        expand_leading_tabs("\tcode\there", &mut out);
        assert_eq!(out, "    code\there");
        out.clear();
        expand_leading_tabs("  \tx", &mut out);
        assert_eq!(out, "    x");
    }

    #[test]
    fn test_normalize_line_endings() {
        let html = MarkdownEngine::new().render("a\r\nb\rc");
        assert_eq!(html, "<p>a\nb\nc</p>\n");
    }

    #[test]
    fn test_normalize_nul() {
        let html = MarkdownEngine::new().render("a\0b");
        assert_eq!(html, "<p>a\u{FFFD}b</p>\n");
    }

    #[test]
    fn test_tab_indented_code() {
        let html = MarkdownEngine::new().render("\tcode");
        assert_eq!(html, "<pre><code>code\n</code></pre>\n");
    }

    #[test]
    fn test_text_join_merges_specials() {
        let (stream, _env) = MarkdownEngine::new().parse(r"a \* b &amp; c");
        let inline = stream.blocks()[1];
        let children = stream.children(inline);
        assert_eq!(children.len(), 1);
        assert_eq!(stream.get(children[0]).content, "a * b & c");
    }

    #[test]
    fn test_default_core_order() {
        let engine = MarkdownEngine::new();
        assert_eq!(
            engine.rule_names(crate::Phase::Core),
            vec!["normalize", "block", "inline", "text_join"]
        );
    }
}
