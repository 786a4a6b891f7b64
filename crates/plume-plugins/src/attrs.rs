//! Attribute attachment: `{#id .class key=value}` after blocks and spans.
//!
//! The attribute list is recognized in four places:
//!
//! - at the end of a heading or paragraph (or table cell), attached to that
//!   block; inside a tight list the paragraph is hidden, so the list item
//!   receives the attributes instead;
//! - directly after an inline closer (`**bold**{.x}`), a code span or an
//!   image, attached to that span;
//! - at the end of a fence or div info string;
//! - as a paragraph of its own right after a list, blockquote, table or div,
//!   attached to that container.

use plume_renderer::attr_syntax::{AttrSyntax, Delimiters};
use plume_renderer::{
    CoreRule, CoreState, MarkdownEngine, Nesting, Plugin, RegistryError, TokenId, TokenStream,
};

/// Containers that take a standalone attribute paragraph.
const CONTAINERS: &[&str] = &["bullet_list", "ordered_list", "blockquote", "table", "div"];

/// Block kinds whose info string may end with an attribute list.
const INFO_BLOCKS: &[&str] = &["fence", "div"];

/// The `attrs` plugin.
///
/// # Example
///
/// ```
/// use plume_plugins::AttrsPlugin;
/// use plume_renderer::MarkdownEngine;
///
/// let engine = MarkdownEngine::new().with_plugin(AttrsPlugin::new())?;
/// assert_eq!(
///     engine.render("# Heading {#custom-id}"),
///     "<h1 id=\"custom-id\">Heading</h1>\n"
/// );
/// # Ok::<(), plume_renderer::RegistryError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct AttrsPlugin {
    delimiters: Delimiters,
    allowed: Option<Vec<String>>,
}

impl AttrsPlugin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use other delimiters than `{` and `}`.
    #[must_use]
    pub fn with_delimiters(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.delimiters = Delimiters {
            left: left.into(),
            right: right.into(),
        };
        self
    }

    /// Only attach the listed attribute names (`id` and `class` included).
    #[must_use]
    pub fn with_allowed<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

impl Plugin for AttrsPlugin {
    fn name(&self) -> &str {
        "attrs"
    }

    fn register(&self, engine: &mut MarkdownEngine) -> Result<(), RegistryError> {
        engine.core_mut().after(
            "inline",
            Box::new(CurlyAttributes {
                delimiters: self.delimiters.clone(),
                allowed: self.allowed.clone(),
            }),
        )
    }
}

struct CurlyAttributes {
    delimiters: Delimiters,
    allowed: Option<Vec<String>>,
}

impl CoreRule for CurlyAttributes {
    fn name(&self) -> &str {
        "curly_attributes"
    }

    fn apply(&self, state: &mut CoreState<'_>) {
        let stream = &mut state.stream;
        let mut idx = 0;
        while idx < stream.block_len() {
            let id = stream.blocks()[idx];
            let kind = &*stream.get(id).kind;
            let (is_inline, has_info) = (kind == "inline", INFO_BLOCKS.contains(&kind));
            if is_inline {
                if self.attach_standalone(stream, idx) {
                    // The paragraph is gone; `idx - 1` now holds its successor.
                    idx -= 1;
                    continue;
                }
                self.attach_after_spans(stream, id);
                self.attach_trailing(stream, idx);
            } else if has_info {
                self.attach_info(stream, id);
            }
            idx += 1;
        }
    }
}

impl CurlyAttributes {
    fn merge(&self, attrs: &AttrSyntax, stream: &mut TokenStream, target: TokenId) {
        attrs.merge_into(&mut stream.get_mut(target).attrs, self.allowed.as_deref());
    }

    /// `{...}` starting a text token right after a span.
    fn attach_after_spans(&self, stream: &mut TokenStream, parent: TokenId) {
        let children = stream.children(parent).to_vec();
        let mut kept = Vec::with_capacity(children.len());
        for (pos, &child) in children.iter().enumerate() {
            if pos > 0
                && stream.get(child).kind == "text"
                && let Some(target) = span_target(stream, &children, pos - 1)
                && let Some((attrs, len)) = self.delimiters.find_leading(&stream.get(child).content)
            {
                self.merge(&attrs, stream, target);
                let text = &mut stream.get_mut(child).content;
                text.drain(..len);
                if text.is_empty() {
                    continue;
                }
            }
            kept.push(child);
        }
        stream.set_children(parent, kept);
    }

    /// `{...}` closing the inline content of a block.
    fn attach_trailing(&self, stream: &mut TokenStream, idx: usize) {
        let Some(opener_idx) = idx.checked_sub(1) else {
            return;
        };
        let opener = stream.blocks()[opener_idx];
        if stream.get(opener).nesting != Nesting::Open {
            return;
        }
        let inline = stream.blocks()[idx];
        let children = stream.children(inline).to_vec();
        let Some((&last, before)) = children.split_last() else {
            return;
        };
        if stream.get(last).kind != "text" {
            return;
        }
        let Some((start, attrs)) = self.delimiters.find_trailing(&stream.get(last).content) else {
            return;
        };
        let remaining = stream.get(last).content[..start].trim_end().len();
        if remaining == 0 && before.is_empty() {
            return;
        }

        let target = if stream.get(opener).hidden {
            match opener_idx.checked_sub(1).map(|i| stream.blocks()[i]) {
                Some(item) if stream.get(item).kind == "list_item" => item,
                _ => opener,
            }
        } else {
            opener
        };
        self.merge(&attrs, stream, target);

        stream.get_mut(last).content.truncate(remaining);
        if remaining == 0 {
            stream.set_children(inline, before.to_vec());
        }
    }

    /// A paragraph holding only `{...}` right after a container closes.
    fn attach_standalone(&self, stream: &mut TokenStream, idx: usize) -> bool {
        if idx < 2 || idx + 1 >= stream.block_len() {
            return false;
        }
        let blocks = stream.blocks();
        let (container, open, close) = (blocks[idx - 2], blocks[idx - 1], blocks[idx + 1]);
        let is_paragraph =
            |id: TokenId| stream.get(id).kind == "paragraph" && !stream.get(id).hidden;
        if !is_paragraph(open) || !is_paragraph(close) {
            return false;
        }
        let closed = stream.get(container);
        if closed.nesting != Nesting::Close || !CONTAINERS.contains(&&*closed.kind) {
            return false;
        }
        let content = stream.get(blocks[idx]).content.trim();
        let Some((attrs, len)) = self.delimiters.find_leading(content) else {
            return false;
        };
        if len != content.len() {
            return false;
        }
        let Some(opener) = stream.find_opener(blocks, idx - 2).map(|pos| blocks[pos]) else {
            return false;
        };

        self.merge(&attrs, stream, opener);
        stream.blocks_mut().drain(idx - 1..=idx + 1);
        true
    }

    /// `{...}` at the end of a fence or div info string.
    fn attach_info(&self, stream: &mut TokenStream, id: TokenId) {
        let Some((start, attrs)) = self.delimiters.find_trailing(&stream.get(id).info) else {
            return;
        };
        self.merge(&attrs, stream, id);
        let info = &mut stream.get_mut(id).info;
        info.truncate(start);
        info.truncate(info.trim_end().len());
    }
}

/// Token that receives attributes written right after `list[pos]`.
fn span_target(stream: &TokenStream, list: &[TokenId], pos: usize) -> Option<TokenId> {
    let token = stream.get(list[pos]);
    match token.nesting {
        Nesting::Close => stream.find_opener(list, pos).map(|open| list[open]),
        Nesting::SelfClosing if matches!(&*token.kind, "code_inline" | "image") => Some(list[pos]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(input: &str) -> String {
        MarkdownEngine::new()
            .with_plugin(AttrsPlugin::new())
            .unwrap()
            .render(input)
    }

    #[test]
    fn test_heading_id() {
        assert_eq!(
            render("# Heading {#custom-id}"),
            "<h1 id=\"custom-id\">Heading</h1>\n"
        );
    }

    #[test]
    fn test_heading_full_syntax() {
        assert_eq!(
            render(r#"## Title {#t .a .b data-x="1 2"}"#),
            "<h2 id=\"t\" class=\"a b\" data-x=\"1 2\">Title</h2>\n"
        );
    }

    #[test]
    fn test_paragraph_trailing() {
        assert_eq!(
            render("Some text {.lead}"),
            "<p class=\"lead\">Some text</p>\n"
        );
    }

    #[test]
    fn test_after_inline_closer() {
        assert_eq!(
            render("a **bold**{.x} b"),
            "<p>a <strong class=\"x\">bold</strong> b</p>\n"
        );
    }

    #[test]
    fn test_span_at_end_of_paragraph() {
        assert_eq!(render("*em*{.x}"), "<p><em class=\"x\">em</em></p>\n");
    }

    #[test]
    fn test_after_code_span() {
        assert_eq!(
            render("`x`{.lang}"),
            "<p><code class=\"lang\">x</code></p>\n"
        );
    }

    #[test]
    fn test_after_link() {
        assert_eq!(
            render("[site](https://a.b){target=_blank}"),
            "<p><a href=\"https://a.b\" target=\"_blank\">site</a></p>\n"
        );
    }

    #[test]
    fn test_tight_list_item() {
        assert_eq!(
            render("- one {.first}\n- two"),
            "<ul>\n<li class=\"first\">one</li>\n<li>two</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_standalone_after_list() {
        assert_eq!(
            render("- one\n- two\n\n{.steps}"),
            "<ul class=\"steps\">\n<li>one</li>\n<li>two</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_standalone_without_container_stays_literal() {
        assert_eq!(render("{.x}"), "<p>{.x}</p>\n");
    }

    #[test]
    fn test_fence_info() {
        assert_eq!(
            render("```rust {.numbered}\nfn main() {}\n```"),
            "<pre><code class=\"numbered language-rust\">fn main() {}\n</code></pre>\n"
        );
    }

    #[test]
    fn test_unterminated_stays_literal() {
        assert_eq!(render("# Title {#open"), "<h1>Title {#open</h1>\n");
    }

    #[test]
    fn test_plain_braces_stay_literal() {
        assert_eq!(render("a set {1, 2}"), "<p>a set {1, 2}</p>\n");
    }

    #[test]
    fn test_escaped_brace_stays_literal() {
        assert_eq!(render(r"Title \{#id}"), "<p>Title {#id}</p>\n");
    }

    #[test]
    fn test_allow_list() {
        let engine = MarkdownEngine::new()
            .with_plugin(AttrsPlugin::new().with_allowed(["id"]))
            .unwrap();
        assert_eq!(
            engine.render("# T {#t .c onclick=x}"),
            "<h1 id=\"t\">T</h1>\n"
        );
    }

    #[test]
    fn test_custom_delimiters() {
        let engine = MarkdownEngine::new()
            .with_plugin(AttrsPlugin::new().with_delimiters("{{", "}}"))
            .unwrap();
        assert_eq!(engine.render("# T {{#t}}"), "<h1 id=\"t\">T</h1>\n");
        assert_eq!(engine.render("# T {#t}"), "<h1>T {#t}</h1>\n");
    }

    #[test]
    fn test_registers_after_inline() {
        let engine = MarkdownEngine::new().with_plugin(AttrsPlugin::new()).unwrap();
        assert_eq!(
            engine.rule_names(plume_renderer::Phase::Core),
            vec!["normalize", "block", "inline", "curly_attributes", "text_join"]
        );
    }
}
