use std::borrow::Cow;

use super::Renderer;
use crate::env::Env;
use crate::options::RenderOptions;
use crate::token::{Attrs, Nesting, Token, TokenId, TokenStream};
use crate::util::{escape_html, escape_html_into, unescape};

/// Read-only view handed to render rules.
pub struct RenderContext<'a> {
    renderer: &'a Renderer,
    stream: &'a TokenStream,
    env: &'a Env,
    options: &'a RenderOptions,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(
        renderer: &'a Renderer,
        stream: &'a TokenStream,
        env: &'a Env,
        options: &'a RenderOptions,
    ) -> Self {
        Self {
            renderer,
            stream,
            env,
            options,
        }
    }

    #[must_use]
    pub fn stream(&self) -> &'a TokenStream {
        self.stream
    }

    #[must_use]
    pub fn env(&self) -> &'a Env {
        self.env
    }

    #[must_use]
    pub fn options(&self) -> &'a RenderOptions {
        self.options
    }

    /// Escape text content according to the `html_escaping` option.
    #[must_use]
    pub fn escape<'s>(&self, text: &'s str) -> Cow<'s, str> {
        if self.options.html_escaping {
            escape_html(text)
        } else {
            Cow::Borrowed(text)
        }
    }

    /// Render a block-level token list.
    pub fn render_blocks(&self, tokens: &[TokenId], out: &mut String) {
        for (idx, &id) in tokens.iter().enumerate() {
            if self.stream.get(id).kind == "inline" {
                self.render_inline(self.stream.children(id), out);
            } else {
                self.render_at(tokens, idx, out);
            }
        }
    }

    /// Render an inline children list.
    pub fn render_inline(&self, tokens: &[TokenId], out: &mut String) {
        for idx in 0..tokens.len() {
            self.render_at(tokens, idx, out);
        }
    }

    /// Render one token with the registered, built-in or default rule.
    pub fn render_at(&self, tokens: &[TokenId], idx: usize, out: &mut String) {
        let token = self.stream.get(tokens[idx]);
        if let Some(rule) = self.renderer.rule(&token.kind) {
            rule.render(self, tokens, idx, out);
        } else if !self.render_builtin(tokens, idx, out) {
            self.render_token(tokens, idx, out);
        }
    }

    /// Run the built-in rule for the token's kind, if there is one.
    pub fn render_builtin(&self, tokens: &[TokenId], idx: usize, out: &mut String) -> bool {
        let token = self.stream.get(tokens[idx]);
        match &*token.kind {
            "text" | "text_special" => out.push_str(&self.escape(&token.content)),
            "code_inline" => {
                out.push_str("<code");
                self.render_attrs(&token.attrs, out);
                out.push('>');
                escape_html_into(out, &token.content);
                out.push_str("</code>");
            }
            "code_block" => {
                out.push_str("<pre");
                self.render_attrs(&token.attrs, out);
                out.push_str("><code>");
                escape_html_into(out, &token.content);
                out.push_str("</code></pre>\n");
            }
            "fence" => self.render_fence(token, out),
            "image" => {
                let mut attrs = token.attrs.clone();
                attrs.set("alt", self.inline_text(&token.children));
                out.push_str("<img");
                self.render_attrs(&attrs, out);
                out.push_str(self.self_close());
                out.push('>');
            }
            "hardbreak" => {
                out.push_str("<br");
                out.push_str(self.self_close());
                out.push_str(">\n");
            }
            "softbreak" => {
                if self.options.breaks {
                    out.push_str("<br");
                    out.push_str(self.self_close());
                    out.push('>');
                }
                out.push('\n');
            }
            "html_block" | "html_inline" => {
                if self.options.raw_html {
                    out.push_str(&token.content);
                } else {
                    escape_html_into(out, &token.content);
                }
            }
            _ => return false,
        }
        true
    }

    fn render_fence(&self, token: &Token, out: &mut String) {
        let info = unescape(&token.info);
        let lang = info.split_whitespace().next().unwrap_or("");
        let mut attrs = token.attrs.clone();
        if !lang.is_empty() {
            let lang_class = format!("{}{lang}", self.options.lang_prefix);
            let class = match attrs.get("class") {
                Some(existing) => format!("{existing} {lang_class}"),
                None => lang_class,
            };
            attrs.set("class", class);
        }
        out.push_str("<pre><code");
        self.render_attrs(&attrs, out);
        out.push('>');
        escape_html_into(out, &token.content);
        out.push_str("</code></pre>\n");
    }

    /// Default rule: emit the token's own tag and attributes.
    ///
    /// Block tokens get a trailing newline except directly before inline
    /// content or a matching closer; hidden tokens emit nothing.
    pub fn render_token(&self, tokens: &[TokenId], idx: usize, out: &mut String) {
        let token = self.stream.get(tokens[idx]);
        if token.hidden {
            return;
        }
        if token.tag.is_empty() {
            out.push_str(&self.escape(&token.content));
            return;
        }

        // A hidden paragraph before a new block leaves no newline of its own.
        if token.block
            && token.nesting != Nesting::Close
            && idx > 0
            && self.stream.get(tokens[idx - 1]).hidden
        {
            out.push('\n');
        }

        out.push('<');
        if token.nesting == Nesting::Close {
            out.push('/');
        }
        out.push_str(&token.tag);
        self.render_attrs(&token.attrs, out);
        if token.nesting == Nesting::SelfClosing {
            out.push_str(self.self_close());
        }

        let mut need_newline = token.block;
        if token.block
            && token.nesting == Nesting::Open
            && let Some(&next_id) = tokens.get(idx + 1)
        {
            let next = self.stream.get(next_id);
            if next.kind == "inline" || next.hidden {
                need_newline = false;
            } else if next.nesting == Nesting::Close && next.tag == token.tag {
                need_newline = false;
            }
        }

        out.push('>');
        if need_newline {
            out.push('\n');
        }
    }

    /// Render ` key="value"` pairs; values are always escaped.
    pub fn render_attrs(&self, attrs: &Attrs, out: &mut String) {
        for (key, value) in attrs.iter() {
            out.push(' ');
            escape_html_into(out, key);
            out.push_str("=\"");
            escape_html_into(out, value);
            out.push('"');
        }
    }

    /// Plain text of an inline list (for `alt` attributes).
    #[must_use]
    pub fn inline_text(&self, tokens: &[TokenId]) -> String {
        let mut text = String::new();
        for &id in tokens {
            let token = self.stream.get(id);
            match &*token.kind {
                "text" | "text_special" | "code_inline" | "html_inline" | "html_block" => {
                    text.push_str(&token.content);
                }
                "image" => text.push_str(&self.inline_text(&token.children)),
                "softbreak" | "hardbreak" => text.push('\n'),
                _ => {}
            }
        }
        text
    }

    fn self_close(&self) -> &'static str {
        if self.options.xhtml_out { " /" } else { "" }
    }
}

#[cfg(test)]
mod tests {
    use crate::{MarkdownEngine, RenderOptions};

    #[test]
    fn test_html_escaping_off() {
        let engine = MarkdownEngine::with_options(RenderOptions::new().with_html_escaping(false));
        assert_eq!(engine.render("a & b"), "<p>a & b</p>\n");
    }

    #[test]
    fn test_xhtml_out() {
        let engine = MarkdownEngine::with_options(RenderOptions::new().with_xhtml_out(true));
        assert_eq!(engine.render("a  \nb\n\n---"), "<p>a<br />\nb</p>\n<hr />\n");
    }

    #[test]
    fn test_lang_prefix() {
        let engine = MarkdownEngine::with_options(RenderOptions::new().with_lang_prefix("lang-"));
        assert_eq!(
            engine.render("```js extra\nx\n```"),
            "<pre><code class=\"lang-js\">x\n</code></pre>\n"
        );
    }

    #[test]
    fn test_fence_lang_joins_existing_class() {
        let engine = MarkdownEngine::new();
        let (mut stream, env) = engine.parse("```js\nx\n```");
        let fence = stream.blocks()[0];
        stream.get_mut(fence).attrs.set("class", "numbered");
        let html = engine.renderer().render(&stream, &env, engine.options());
        assert_eq!(html, "<pre><code class=\"numbered language-js\">x\n</code></pre>\n");
    }

    #[test]
    fn test_blank_line_inside_item_makes_list_loose() {
        assert_eq!(
            MarkdownEngine::new().render("- a\n\n  b\n- c"),
            "<ul>\n<li>\n<p>a</p>\n<p>b</p>\n</li>\n<li>\n<p>c</p>\n</li>\n</ul>\n"
        );
    }
}
