//! End-to-end rendering with composed plugins.

use plume_plugins::{DivPlugin, MarkPlugin, SubPlugin, apply_named, default_engine, render};
use plume_renderer::{
    DelimitedRule, MarkdownEngine, Phase, Plugin, RegistryError, RenderOptions,
};
use pretty_assertions::assert_eq;

fn render_default(input: &str) -> String {
    render(input, &RenderOptions::default())
}

#[test]
fn test_core_heading() {
    assert!(MarkdownEngine::new().render("# Heading").contains("<h1>Heading</h1>"));
}

#[test]
fn test_attrs_heading_id() {
    let html = render_default("# Heading {#custom-id}");
    assert!(html.contains("id=\"custom-id\""));
    assert!(!html.contains("{#custom-id}"));
}

#[test]
fn test_plugins_work_together() {
    assert!(render_default("==marked text==").contains("<mark>marked text</mark>"));
    assert!(render_default("H~2~O").contains("<sub>2</sub>"));
    assert!(render_default("x^2^").contains("<sup>2</sup>"));
    assert!(render_default("++inserted++").contains("<ins>inserted</ins>"));
}

#[test]
fn test_escaped_entity_is_not_escaped_twice() {
    assert_eq!(render_default("&amp;"), "<p>&amp;</p>\n");
    assert_eq!(render_default("a & b"), "<p>a &amp; b</p>\n");
}

#[test]
fn test_unterminated_delimiters_are_literal() {
    assert_eq!(render_default("==unterminated"), "<p>==unterminated</p>\n");
    assert_eq!(render_default("++open"), "<p>++open</p>\n");
    assert_eq!(render_default("x^open"), "<p>x^open</p>\n");
}

#[test]
fn test_full_document() {
    let input = "\
*[API]: Application Programming Interface

# Guide {#guide}

::: note
The API uses ==marks== and H~2~O.
:::

- first
- second

{.steps}
";
    assert_eq!(
        render_default(input),
        "<h1 id=\"guide\">Guide</h1>\n\
         <div class=\"note\">\n\
         <p>The <abbr title=\"Application Programming Interface\">API</abbr> uses \
         <mark>marks</mark> and H<sub>2</sub>O.</p>\n\
         </div>\n\
         <ul class=\"steps\">\n<li>first</li>\n<li>second</li>\n</ul>\n"
    );
}

#[test]
fn test_div_with_attrs() {
    assert_eq!(
        render_default("::: card {#main data-kind=info}\nx\n:::"),
        "<div class=\"card\" id=\"main\" data-kind=\"info\">\n<p>x</p>\n</div>\n"
    );
}

#[test]
fn test_options_per_call() {
    let options = RenderOptions::new().with_breaks(true);
    assert_eq!(render("a\nb", &options), "<p>a<br>\nb</p>\n");
}

/// `==x==` as a highlighted span, competing with `mark`.
struct Highlight;

impl Plugin for Highlight {
    fn name(&self) -> &str {
        "highlight"
    }

    fn register(&self, engine: &mut MarkdownEngine) -> Result<(), RegistryError> {
        engine.inline_mut().before(
            "emphasis",
            Box::new(DelimitedRule::new("highlight", '=', 2).with_tag("span")),
        )
    }
}

#[test]
fn test_plugin_order_mark_first() {
    let engine = MarkdownEngine::new()
        .with_plugin(MarkPlugin)
        .and_then(|e| e.with_plugin(Highlight))
        .unwrap();
    assert_eq!(engine.render("==x=="), "<p><mark>x</mark></p>\n");
}

#[test]
fn test_plugin_order_highlight_first() {
    let engine = MarkdownEngine::new()
        .with_plugin(Highlight)
        .and_then(|e| e.with_plugin(MarkPlugin))
        .unwrap();
    assert_eq!(engine.render("==x=="), "<p><span>x</span></p>\n");
}

/// `~x~` as small text, competing with `sub` after emphasis.
struct Small;

impl Plugin for Small {
    fn name(&self) -> &str {
        "small"
    }

    fn register(&self, engine: &mut MarkdownEngine) -> Result<(), RegistryError> {
        engine.inline_mut().after(
            "emphasis",
            Box::new(DelimitedRule::new("small", '~', 1).plain()),
        )
    }
}

#[test]
fn test_after_anchor_later_plugin_wins() {
    let engine = MarkdownEngine::new()
        .with_plugin(SubPlugin)
        .and_then(|e| e.with_plugin(Small))
        .unwrap();
    assert_eq!(engine.render("H~2~O"), "<p>H<small>2</small>O</p>\n");
}

#[test]
fn test_after_anchor_other_order() {
    let engine = MarkdownEngine::new()
        .with_plugin(Small)
        .and_then(|e| e.with_plugin(SubPlugin))
        .unwrap();
    assert_eq!(engine.render("H~2~O"), "<p>H<sub>2</sub>O</p>\n");
    let names = engine.rule_names(Phase::Inline);
    let position = |name: &str| names.iter().position(|n| *n == name).unwrap();
    assert!(position("emphasis") < position("sub"));
    assert!(position("sub") < position("small"));
}

#[test]
fn test_plugin_order_is_observable() {
    let mut engine = MarkdownEngine::new();
    apply_named(&mut engine, &["sub", "sup", "mark"]).unwrap();
    let names = engine.rule_names(Phase::Inline);
    let position = |name: &str| names.iter().position(|n| *n == name).unwrap();
    assert!(position("mark") < position("emphasis"));
    assert!(position("emphasis") < position("sup"));
    assert!(position("sup") < position("sub"));
}

#[test]
fn test_plugin_missing_anchor_is_setup_error() {
    let mut engine = MarkdownEngine::new();
    engine.block_mut().replace("fence", Box::new(NoFence)).unwrap();
    let err = engine.with_plugin(DivPlugin).unwrap_err();
    assert_eq!(
        err,
        RegistryError::AnchorNotFound {
            phase: Phase::Block,
            anchor: "fence".to_owned(),
        }
    );
}

/// Stand-in that takes the place of the fence rule under another name.
struct NoFence;

impl plume_renderer::BlockRule for NoFence {
    fn name(&self) -> &str {
        "no_fence"
    }

    fn apply(&self, _state: &mut plume_renderer::BlockState<'_, '_>, _silent: bool) -> bool {
        false
    }
}

#[test]
fn test_default_engine_is_total() {
    let engine = default_engine(RenderOptions::default()).unwrap();
    for input in [
        "{",
        "{#",
        "# {#}",
        ":::",
        "::: x",
        "::: x\n::: y\n:::",
        "*[",
        "*[A]:",
        "~",
        "^^",
        "++",
        "==",
        "== ==",
        "- {.x}",
        "> {.y}\n\n{.z}",
        "```{.a}",
    ] {
        let _ = engine.render(input);
    }
}

#[test]
fn test_sub_plugin_alone() {
    let engine = MarkdownEngine::new().with_plugin(SubPlugin).unwrap();
    assert_eq!(engine.render("H~2~O ==x=="), "<p>H<sub>2</sub>O ==x==</p>\n");
}
