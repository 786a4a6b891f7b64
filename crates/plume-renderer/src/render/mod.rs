//! HTML rendering of a token stream.
//!
//! Render rules are resolved by token kind: a rule registered on the
//! [`Renderer`] wins, then the built-in rule for the kind, then the default
//! rule which emits `<tag attrs>` / `</tag>` from the token itself.

mod context;

pub use context::RenderContext;

use std::collections::HashMap;
use std::sync::Arc;

use crate::env::Env;
use crate::options::RenderOptions;
use crate::token::{TokenId, TokenStream};

/// Renders the token at `tokens[idx]` into `out`.
pub trait RenderRule: Send + Sync {
    fn render(&self, ctx: &RenderContext<'_>, tokens: &[TokenId], idx: usize, out: &mut String);
}

struct FnRule<F>(F);

impl<F> RenderRule for FnRule<F>
where
    F: Fn(&RenderContext<'_>, &[TokenId], usize, &mut String) + Send + Sync,
{
    fn render(&self, ctx: &RenderContext<'_>, tokens: &[TokenId], idx: usize, out: &mut String) {
        (self.0)(ctx, tokens, idx, out);
    }
}

/// Registry of per-kind render rules.
#[derive(Clone, Default)]
pub struct Renderer {
    rules: HashMap<String, Arc<dyn RenderRule>>,
}

impl Renderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a render rule for a token kind, replacing any earlier one.
    pub fn set_rule(&mut self, kind: impl Into<String>, rule: impl RenderRule + 'static) {
        self.rules.insert(kind.into(), Arc::new(rule));
    }

    /// Register a closure as the render rule for a token kind.
    pub fn set_fn<F>(&mut self, kind: impl Into<String>, rule: F)
    where
        F: Fn(&RenderContext<'_>, &[TokenId], usize, &mut String) + Send + Sync + 'static,
    {
        self.set_rule(kind, FnRule(rule));
    }

    /// Remove a registered rule, restoring the built-in behavior.
    pub fn remove_rule(&mut self, kind: &str) -> bool {
        self.rules.remove(kind).is_some()
    }

    #[must_use]
    pub fn has_rule(&self, kind: &str) -> bool {
        self.rules.contains_key(kind)
    }

    pub(crate) fn rule(&self, kind: &str) -> Option<&dyn RenderRule> {
        self.rules.get(kind).map(AsRef::as_ref)
    }

    /// Render a whole stream.
    #[must_use]
    pub fn render(&self, stream: &TokenStream, env: &Env, options: &RenderOptions) -> String {
        let ctx = RenderContext::new(self, stream, env, options);
        let mut out = String::new();
        ctx.render_blocks(stream.blocks(), &mut out);
        out
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.rules.keys().collect();
        kinds.sort();
        f.debug_struct("Renderer").field("rules", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MarkdownEngine;

    #[test]
    fn test_custom_rule_overrides_builtin() {
        let mut engine = MarkdownEngine::new();
        engine.renderer_mut().set_fn("code_inline", |ctx, tokens, idx, out| {
            out.push_str("<kbd>");
            out.push_str(&ctx.escape(&ctx.stream().get(tokens[idx]).content));
            out.push_str("</kbd>");
        });
        assert_eq!(engine.render("`x`"), "<p><kbd>x</kbd></p>\n");
    }

    #[test]
    fn test_most_recent_rule_wins() {
        let mut engine = MarkdownEngine::new();
        engine.renderer_mut().set_fn("hr", |_, _, _, out| out.push_str("first"));
        engine.renderer_mut().set_fn("hr", |_, _, _, out| out.push_str("second"));
        assert_eq!(engine.render("---"), "second");
    }

    #[test]
    fn test_remove_rule_restores_default() {
        let mut engine = MarkdownEngine::new();
        engine.renderer_mut().set_fn("hr", |_, _, _, out| out.push_str("x"));
        assert!(engine.renderer_mut().remove_rule("hr"));
        assert_eq!(engine.render("---"), "<hr>\n");
    }
}
