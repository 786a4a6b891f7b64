//! Delimited inline spans: mark, inserted, subscript and superscript.

use plume_renderer::{DelimitedRule, MarkdownEngine, Plugin, RegistryError};

/// `==marked==` → `<mark>`. Runs before emphasis.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkPlugin;

impl Plugin for MarkPlugin {
    fn name(&self) -> &str {
        "mark"
    }

    fn register(&self, engine: &mut MarkdownEngine) -> Result<(), RegistryError> {
        engine
            .inline_mut()
            .before("emphasis", Box::new(DelimitedRule::new("mark", '=', 2)))
    }
}

/// `++inserted++` → `<ins>`. Runs before emphasis.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsPlugin;

impl Plugin for InsPlugin {
    fn name(&self) -> &str {
        "ins"
    }

    fn register(&self, engine: &mut MarkdownEngine) -> Result<(), RegistryError> {
        engine
            .inline_mut()
            .before("emphasis", Box::new(DelimitedRule::new("ins", '+', 2)))
    }
}

/// `H~2~O` → `H<sub>2</sub>O`.
///
/// The content is plain text: unescaped whitespace makes the markers literal
/// (`~a b~`), escaped spaces are allowed (`~a\ b~`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SubPlugin;

impl Plugin for SubPlugin {
    fn name(&self) -> &str {
        "sub"
    }

    fn register(&self, engine: &mut MarkdownEngine) -> Result<(), RegistryError> {
        engine
            .inline_mut()
            .after("emphasis", Box::new(DelimitedRule::new("sub", '~', 1).plain()))
    }
}

/// `x^2^` → `x<sup>2</sup>`, with the same content rules as [`SubPlugin`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SupPlugin;

impl Plugin for SupPlugin {
    fn name(&self) -> &str {
        "sup"
    }

    fn register(&self, engine: &mut MarkdownEngine) -> Result<(), RegistryError> {
        engine
            .inline_mut()
            .after("emphasis", Box::new(DelimitedRule::new("sup", '^', 1).plain()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn engine() -> MarkdownEngine {
        MarkdownEngine::new()
            .with_plugin(MarkPlugin)
            .and_then(|e| e.with_plugin(SubPlugin))
            .and_then(|e| e.with_plugin(SupPlugin))
            .and_then(|e| e.with_plugin(InsPlugin))
            .unwrap()
    }

    #[test]
    fn test_mark() {
        assert_eq!(
            engine().render("==marked text=="),
            "<p><mark>marked text</mark></p>\n"
        );
    }

    #[test]
    fn test_ins() {
        assert_eq!(
            engine().render("++inserted++"),
            "<p><ins>inserted</ins></p>\n"
        );
    }

    #[test]
    fn test_sub_and_sup() {
        assert_eq!(engine().render("H~2~O"), "<p>H<sub>2</sub>O</p>\n");
        assert_eq!(engine().render("x^2^"), "<p>x<sup>2</sup></p>\n");
    }

    #[test]
    fn test_sub_does_not_take_strikethrough() {
        assert_eq!(
            engine().render("~~gone~~ H~2~O"),
            "<p><s>gone</s> H<sub>2</sub>O</p>\n"
        );
    }

    #[test]
    fn test_sup_with_whitespace_is_literal() {
        assert_eq!(engine().render("a^b c^"), "<p>a^b c^</p>\n");
        assert_eq!(engine().render(r"a^b\ c^"), "<p>a<sup>b c</sup></p>\n");
    }

    #[test]
    fn test_mark_nests_emphasis() {
        assert_eq!(
            engine().render("==a *b* c=="),
            "<p><mark>a <em>b</em> c</mark></p>\n"
        );
    }

    #[test]
    fn test_unterminated_mark_is_literal() {
        assert_eq!(engine().render("==unterminated"), "<p>==unterminated</p>\n");
    }

    #[test]
    fn test_rule_order() {
        assert_eq!(
            engine().rule_names(plume_renderer::Phase::Inline),
            vec![
                "text",
                "newline",
                "escape",
                "backticks",
                "strikethrough",
                "mark",
                "ins",
                "emphasis",
                "sup",
                "sub",
                "link",
                "image",
                "autolink",
                "html_inline",
                "entity"
            ]
        );
    }
}
