//! Heading anchors: slug ids for headings without an explicit id.

use std::collections::HashSet;

use plume_renderer::{
    CoreRule, CoreState, MarkdownEngine, Nesting, Plugin, RegistryError, TokenId, TokenStream,
    slugify,
};

/// The `anchors` plugin.
///
/// Ids are unique within one render: repeated titles get `-1`, `-2`, …
/// suffixes, and explicit ids (from the attrs plugin) are never reused.
///
/// # Example
///
/// ```
/// use plume_plugins::AnchorsPlugin;
/// use plume_renderer::MarkdownEngine;
///
/// let engine = MarkdownEngine::new().with_plugin(AnchorsPlugin::new())?;
/// assert_eq!(
///     engine.render("# FAQ\n## FAQ"),
///     "<h1 id=\"faq\">FAQ</h1>\n<h2 id=\"faq-1\">FAQ</h2>\n"
/// );
/// # Ok::<(), plume_renderer::RegistryError>(())
/// ```
#[derive(Debug, Clone)]
pub struct AnchorsPlugin {
    min_level: u8,
    max_level: u8,
}

impl Default for AnchorsPlugin {
    fn default() -> Self {
        Self {
            min_level: 1,
            max_level: 6,
        }
    }
}

impl AnchorsPlugin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only anchor headings with a level in `min..=max`.
    #[must_use]
    pub fn with_levels(mut self, min: u8, max: u8) -> Self {
        self.min_level = min;
        self.max_level = max;
        self
    }
}

impl Plugin for AnchorsPlugin {
    fn name(&self) -> &str {
        "anchors"
    }

    fn register(&self, engine: &mut MarkdownEngine) -> Result<(), RegistryError> {
        engine.core_mut().push(Box::new(HeadingAnchors {
            min_level: self.min_level,
            max_level: self.max_level,
        }))
    }
}

/// Ids handed out during the current render.
#[derive(Debug, Default)]
struct UsedIds(HashSet<String>);

impl UsedIds {
    fn claim(&mut self, base: String) -> String {
        if self.0.insert(base.clone()) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}-{n}");
            if self.0.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

struct HeadingAnchors {
    min_level: u8,
    max_level: u8,
}

impl HeadingAnchors {
    fn in_range(&self, tag: &str) -> bool {
        tag.strip_prefix('h')
            .and_then(|n| n.parse::<u8>().ok())
            .is_some_and(|level| (self.min_level..=self.max_level).contains(&level))
    }
}

impl CoreRule for HeadingAnchors {
    fn name(&self) -> &str {
        "heading_anchors"
    }

    fn apply(&self, state: &mut CoreState<'_>) {
        let stream = &mut state.stream;
        let headings: Vec<(TokenId, Option<TokenId>)> = stream
            .blocks()
            .iter()
            .enumerate()
            .filter(|&(_, &id)| {
                let token = stream.get(id);
                token.kind == "heading" && token.nesting == Nesting::Open
            })
            .map(|(idx, &id)| (id, stream.blocks().get(idx + 1).copied()))
            .collect();

        let used = state.env.get_or_default::<UsedIds>();
        for &(heading, _) in &headings {
            if let Some(id) = stream.get(heading).attrs.get("id") {
                used.0.insert(id.to_owned());
            }
        }

        for (heading, inline) in headings {
            let token = stream.get(heading);
            if token.attrs.contains("id") || !self.in_range(&token.tag) {
                continue;
            }
            let text = inline.map(|id| plain_text(stream, id)).unwrap_or_default();
            let slug = match slugify(&text) {
                slug if slug.is_empty() => "section".to_owned(),
                slug => slug,
            };
            let id = used.claim(slug);
            stream.get_mut(heading).attrs.set("id", id);
        }
    }
}

/// Text content of an inline token's children.
fn plain_text(stream: &TokenStream, parent: TokenId) -> String {
    let mut text = String::new();
    for &id in stream.children(parent) {
        let token = stream.get(id);
        match &*token.kind {
            "text" | "text_special" | "code_inline" => text.push_str(&token.content),
            "image" => text.push_str(&plain_text(stream, id)),
            "softbreak" | "hardbreak" => text.push(' '),
            _ => {}
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AttrsPlugin;
    use pretty_assertions::assert_eq;

    fn render(input: &str) -> String {
        MarkdownEngine::new()
            .with_plugin(AnchorsPlugin::new())
            .unwrap()
            .render(input)
    }

    #[test]
    fn test_slug_from_inline_text() {
        assert_eq!(
            render("## Getting *Started* with `plume`"),
            "<h2 id=\"getting-started-with-plume\">Getting <em>Started</em> with <code>plume</code></h2>\n"
        );
    }

    #[test]
    fn test_duplicates_get_suffixes() {
        assert_eq!(
            render("# A\n# A\n# A"),
            "<h1 id=\"a\">A</h1>\n<h1 id=\"a-1\">A</h1>\n<h1 id=\"a-2\">A</h1>\n"
        );
    }

    #[test]
    fn test_empty_heading_text() {
        assert_eq!(render("# !!!"), "<h1 id=\"section\">!!!</h1>\n");
    }

    #[test]
    fn test_explicit_ids_are_kept_and_reserved() {
        let engine = MarkdownEngine::new()
            .with_plugin(AnchorsPlugin::new())
            .and_then(|e| e.with_plugin(AttrsPlugin::new()))
            .unwrap();
        assert_eq!(
            engine.render("# Intro\n# Other {#intro}"),
            "<h1 id=\"intro-1\">Intro</h1>\n<h1 id=\"intro\">Other</h1>\n"
        );
    }

    #[test]
    fn test_levels() {
        let engine = MarkdownEngine::new()
            .with_plugin(AnchorsPlugin::new().with_levels(2, 3))
            .unwrap();
        assert_eq!(
            engine.render("# One\n## Two"),
            "<h1>One</h1>\n<h2 id=\"two\">Two</h2>\n"
        );
    }

    #[test]
    fn test_ids_do_not_leak_between_renders() {
        let engine = MarkdownEngine::new().with_plugin(AnchorsPlugin::new()).unwrap();
        assert_eq!(engine.render("# A"), "<h1 id=\"a\">A</h1>\n");
        assert_eq!(engine.render("# A"), "<h1 id=\"a\">A</h1>\n");
    }
}
