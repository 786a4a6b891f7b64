//! The markdown engine: rule registries, renderer and plugin composition.

use crate::block::{
    BlockRule, BlockquoteRule, CodeRule, FenceRule, HeadingRule, HrRule, HtmlBlockRule,
    LHeadingRule, ListRule, ParagraphRule, ReferenceRule, TableRule,
};
use crate::core_rules::{BlockPass, CoreRule, CoreState, InlinePass, NormalizeRule, TextJoin};
use crate::env::Env;
use crate::error::RegistryError;
use crate::inline::{
    AutolinkRule, BackticksRule, DelimitedRule, EmphasisRule, EntityRule, EscapeRule,
    HtmlInlineRule, ImageRule, InlineRule, LinkRule, NewlineRule, TextRule,
};
use crate::options::RenderOptions;
use crate::plugin::Plugin;
use crate::render::Renderer;
use crate::ruler::Ruler;
use crate::token::{Phase, TokenStream};

/// Result of rendering a document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderResult {
    /// Rendered HTML.
    pub html: String,
    /// Non-fatal diagnostics about the input (e.g. unclosed containers).
    pub warnings: Vec<String>,
}

/// Markdown-to-HTML engine.
///
/// Built once at setup (options, rules, plugins), then shared immutably:
/// every render call allocates its own token stream and [`Env`].
///
/// # Example
///
/// ```
/// use plume_renderer::MarkdownEngine;
///
/// let engine = MarkdownEngine::new();
/// assert_eq!(engine.render("# Heading"), "<h1>Heading</h1>\n");
/// ```
pub struct MarkdownEngine {
    options: RenderOptions,
    core: Ruler<dyn CoreRule>,
    block: Ruler<dyn BlockRule>,
    inline: Ruler<dyn InlineRule>,
    renderer: Renderer,
    plugins: Vec<String>,
}

impl Default for MarkdownEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownEngine {
    /// Create an engine with default options and the built-in rules.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(RenderOptions::default())
    }

    /// Create an engine with the given options and the built-in rules.
    #[must_use]
    pub fn with_options(options: RenderOptions) -> Self {
        let core: Vec<Box<dyn CoreRule>> = vec![
            Box::new(NormalizeRule),
            Box::new(BlockPass),
            Box::new(InlinePass),
            Box::new(TextJoin),
        ];
        let block: Vec<Box<dyn BlockRule>> = vec![
            Box::new(TableRule),
            Box::new(CodeRule),
            Box::new(FenceRule),
            Box::new(BlockquoteRule),
            Box::new(HrRule),
            Box::new(ListRule),
            Box::new(ReferenceRule),
            Box::new(HtmlBlockRule),
            Box::new(HeadingRule),
            Box::new(LHeadingRule),
            Box::new(ParagraphRule),
        ];
        let inline: Vec<Box<dyn InlineRule>> = vec![
            Box::new(TextRule),
            Box::new(NewlineRule),
            Box::new(EscapeRule),
            Box::new(BackticksRule),
            Box::new(DelimitedRule::new("strikethrough", '~', 2).with_kind("s").with_tag("s")),
            Box::new(EmphasisRule),
            Box::new(LinkRule),
            Box::new(ImageRule),
            Box::new(AutolinkRule),
            Box::new(HtmlInlineRule),
            Box::new(EntityRule),
        ];

        Self {
            options,
            core: Ruler::with_rules(Phase::Core, core),
            block: Ruler::with_rules(Phase::Block, block),
            inline: Ruler::with_rules(Phase::Inline, inline),
            renderer: Renderer::new(),
            plugins: Vec::new(),
        }
    }

    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    #[must_use]
    pub fn core(&self) -> &Ruler<dyn CoreRule> {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut Ruler<dyn CoreRule> {
        &mut self.core
    }

    #[must_use]
    pub fn block(&self) -> &Ruler<dyn BlockRule> {
        &self.block
    }

    pub fn block_mut(&mut self) -> &mut Ruler<dyn BlockRule> {
        &mut self.block
    }

    #[must_use]
    pub fn inline(&self) -> &Ruler<dyn InlineRule> {
        &self.inline
    }

    pub fn inline_mut(&mut self) -> &mut Ruler<dyn InlineRule> {
        &mut self.inline
    }

    #[must_use]
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    /// Effective rule order of a phase.
    #[must_use]
    pub fn rule_names(&self, phase: Phase) -> Vec<&str> {
        match phase {
            Phase::Core => self.core.names(),
            Phase::Block => self.block.names(),
            Phase::Inline => self.inline.names(),
        }
    }

    /// Apply a plugin, builder-style.
    ///
    /// # Errors
    ///
    /// See [`apply_plugin`](Self::apply_plugin).
    pub fn with_plugin<P: Plugin>(mut self, plugin: P) -> Result<Self, RegistryError> {
        self.apply_plugin(&plugin)?;
        Ok(self)
    }

    /// Apply a plugin to this engine.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::PluginAlreadyApplied`] when a plugin with the
    /// same name was applied before, or whatever error the plugin's
    /// registration reports. A failed registration leaves the engine as it
    /// was before the call.
    pub fn apply_plugin(&mut self, plugin: &dyn Plugin) -> Result<(), RegistryError> {
        let name = plugin.name().to_owned();
        if self.plugins.contains(&name) {
            return Err(RegistryError::PluginAlreadyApplied(name));
        }
        let saved = (
            self.core.clone(),
            self.block.clone(),
            self.inline.clone(),
            self.renderer.clone(),
        );
        if let Err(err) = plugin.register(self) {
            (self.core, self.block, self.inline, self.renderer) = saved;
            tracing::debug!(plugin = %name, error = %err, "Plugin registration rolled back");
            return Err(err);
        }
        tracing::debug!(plugin = %name, "Applied plugin");
        self.plugins.push(name);
        Ok(())
    }

    /// Names of applied plugins, in application order.
    #[must_use]
    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    /// Tokenize without rendering.
    #[must_use]
    pub fn parse(&self, input: &str) -> (TokenStream, Env) {
        self.parse_with(input, &self.options)
    }

    /// Render with the engine's options.
    #[must_use]
    pub fn render(&self, input: &str) -> String {
        self.render_with_options(input, &self.options)
    }

    /// Render with per-call options.
    #[must_use]
    pub fn render_with_options(&self, input: &str, options: &RenderOptions) -> String {
        self.render_document_with(input, options).html
    }

    /// Render and collect warnings.
    #[must_use]
    pub fn render_document(&self, input: &str) -> RenderResult {
        self.render_document_with(input, &self.options)
    }

    fn parse_with(&self, input: &str, options: &RenderOptions) -> (TokenStream, Env) {
        let mut state = CoreState::new(input.to_owned(), options, &self.block, &self.inline);
        for rule in self.core.iter() {
            rule.apply(&mut state);
        }
        state.into_parts()
    }

    fn render_document_with(&self, input: &str, options: &RenderOptions) -> RenderResult {
        let (stream, mut env) = self.parse_with(input, options);
        let html = self.renderer.render(&stream, &env, options);
        let warnings = env.take_warnings();
        tracing::debug!(
            input_len = input.len(),
            html_len = html.len(),
            warnings = warnings.len(),
            "Rendered document"
        );
        RenderResult { html, warnings }
    }
}

impl std::fmt::Debug for MarkdownEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownEngine")
            .field("options", &self.options)
            .field("core", &self.core)
            .field("block", &self.block)
            .field("inline", &self.inline)
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}
