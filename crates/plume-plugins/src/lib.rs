//! Syntax plugins for the plume markdown engine.
//!
//! | Plugin    | Syntax                                    | Registers                          |
//! |-----------|-------------------------------------------|------------------------------------|
//! | `attrs`   | `{#id .class key=value}`                  | core `curly_attributes` after `inline` |
//! | `div`     | `::: name` … `:::`                        | block `div` before `fence`         |
//! | `mark`    | `==text==`                                | inline `mark` before `emphasis`    |
//! | `sub`     | `~text~`                                  | inline `sub` after `emphasis`      |
//! | `sup`     | `^text^`                                  | inline `sup` after `emphasis`      |
//! | `ins`     | `++text++`                                | inline `ins` before `emphasis`     |
//! | `abbr`    | `*[LABEL]: Title`                         | block `abbr_def`, core `abbr_replace` |
//! | `anchors` | (none)                                    | core `heading_anchors` at the end  |
//!
//! The default composition applies [`DEFAULT_PLUGINS`] in order; `anchors`
//! is opt-in.
//!
//! # Example
//!
//! ```
//! use plume_plugins::render;
//! use plume_renderer::RenderOptions;
//!
//! let html = render("H~2~O is ==important==", &RenderOptions::default());
//! assert_eq!(html, "<p>H<sub>2</sub>O is <mark>important</mark></p>\n");
//! ```

mod abbr;
mod anchors;
mod attrs;
mod div;
mod spans;

use std::sync::LazyLock;

use plume_renderer::{MarkdownEngine, Plugin, RegistryError, RenderOptions};

pub use abbr::AbbrPlugin;
pub use anchors::AnchorsPlugin;
pub use attrs::AttrsPlugin;
pub use div::DivPlugin;
pub use spans::{InsPlugin, MarkPlugin, SubPlugin, SupPlugin};

/// Plugins of the default composition, in application order.
pub const DEFAULT_PLUGINS: &[&str] = &["attrs", "div", "mark", "sub", "sup", "ins", "abbr"];

/// Every plugin name [`plugin_by_name`] knows.
pub const PLUGIN_NAMES: &[&str] = &[
    "attrs", "div", "mark", "sub", "sup", "ins", "abbr", "anchors",
];

/// Look up a plugin with default options by name.
///
/// # Errors
///
/// Returns [`RegistryError::UnknownPlugin`] for names not in
/// [`PLUGIN_NAMES`].
pub fn plugin_by_name(name: &str) -> Result<Box<dyn Plugin>, RegistryError> {
    Ok(match name {
        "attrs" => Box::new(AttrsPlugin::new()),
        "div" => Box::new(DivPlugin),
        "mark" => Box::new(MarkPlugin),
        "sub" => Box::new(SubPlugin),
        "sup" => Box::new(SupPlugin),
        "ins" => Box::new(InsPlugin),
        "abbr" => Box::new(AbbrPlugin),
        "anchors" => Box::new(AnchorsPlugin::new()),
        _ => return Err(RegistryError::UnknownPlugin(name.to_owned())),
    })
}

/// Apply plugins by name, in order.
///
/// # Errors
///
/// Returns the first [`RegistryError`]: an unknown name, a plugin applied
/// twice, or a missing anchor rule.
pub fn apply_named<S: AsRef<str>>(
    engine: &mut MarkdownEngine,
    names: &[S],
) -> Result<(), RegistryError> {
    for name in names {
        let plugin = plugin_by_name(name.as_ref())?;
        engine.apply_plugin(&plugin)?;
    }
    Ok(())
}

/// Engine with the default plugin composition.
///
/// # Errors
///
/// Returns a [`RegistryError`] if the default plugins fail to compose.
pub fn default_engine(options: RenderOptions) -> Result<MarkdownEngine, RegistryError> {
    let mut engine = MarkdownEngine::with_options(options);
    apply_named(&mut engine, DEFAULT_PLUGINS)?;
    Ok(engine)
}

static DEFAULT_ENGINE: LazyLock<MarkdownEngine> = LazyLock::new(|| {
    default_engine(RenderOptions::default())
        .unwrap_or_else(|e| unreachable!("default plugins compose: {e}"))
});

/// Render with the default plugin composition.
///
/// Never fails: malformed markdown degrades to literal text.
#[must_use]
pub fn render(input: &str, options: &RenderOptions) -> String {
    DEFAULT_ENGINE.render_with_options(input, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_resolves() {
        for name in PLUGIN_NAMES {
            assert_eq!(plugin_by_name(name).unwrap().name(), *name);
        }
    }

    #[test]
    fn test_unknown_plugin() {
        let err = plugin_by_name("footnote").err().expect("unknown plugin must error");
        assert_eq!(err, RegistryError::UnknownPlugin("footnote".to_owned()));
        assert_eq!(err.to_string(), "unknown plugin `footnote`");
    }

    #[test]
    fn test_default_engine_plugins() {
        let engine = default_engine(RenderOptions::default()).unwrap();
        assert_eq!(engine.plugins(), DEFAULT_PLUGINS);
    }

    #[test]
    fn test_apply_named_rejects_repeats() {
        let mut engine = MarkdownEngine::new();
        let err = apply_named(&mut engine, &["mark", "mark"]).unwrap_err();
        assert_eq!(err, RegistryError::PluginAlreadyApplied("mark".to_owned()));
    }
}
