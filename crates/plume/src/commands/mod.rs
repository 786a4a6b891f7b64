//! CLI command implementations.

pub(crate) mod render;
pub(crate) mod rules;

pub(crate) use render::RenderArgs;
pub(crate) use rules::RulesArgs;

use plume_config::Config;
use plume_plugins::{AnchorsPlugin, AttrsPlugin, plugin_by_name};
use plume_renderer::{MarkdownEngine, RegistryError};

/// Build an engine from configuration.
///
/// Plugins are applied in `plugins.enabled` order; `attrs` and `anchors`
/// take their options from their config sections.
pub(crate) fn build_engine(config: &Config) -> Result<MarkdownEngine, RegistryError> {
    let mut engine = MarkdownEngine::with_options(config.render.clone());
    for name in &config.plugins.enabled {
        match name.as_str() {
            "attrs" => {
                let mut plugin =
                    AttrsPlugin::new().with_delimiters(&config.attrs.left, &config.attrs.right);
                if let Some(allowed) = &config.attrs.allowed {
                    plugin = plugin.with_allowed(allowed);
                }
                engine.apply_plugin(&plugin)?;
            }
            "anchors" => {
                let plugin = AnchorsPlugin::new()
                    .with_levels(config.anchors.min_level, config.anchors.max_level);
                engine.apply_plugin(&plugin)?;
            }
            other => engine.apply_plugin(plugin_by_name(other)?.as_ref())?,
        }
    }
    tracing::info!(plugins = ?engine.plugins(), "Built engine");
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plume_config::{AnchorsConfig, AttrsConfig, PluginsConfig};
    use plume_renderer::Phase;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_engine_default_config() {
        let engine = build_engine(&Config::default()).unwrap();
        assert_eq!(engine.plugins(), plume_plugins::DEFAULT_PLUGINS);
        assert_eq!(
            engine.render("==x== H~2~O"),
            "<p><mark>x</mark> H<sub>2</sub>O</p>\n"
        );
    }

    #[test]
    fn test_build_engine_respects_order() {
        let config = Config {
            plugins: PluginsConfig {
                enabled: vec!["sub".to_owned(), "mark".to_owned()],
            },
            ..Config::default()
        };
        let engine = build_engine(&config).unwrap();
        let names = engine.rule_names(Phase::Inline);
        let position = |name: &str| names.iter().position(|n| *n == name).unwrap();
        assert!(position("mark") < position("emphasis"));
        assert!(position("emphasis") < position("sub"));
    }

    #[test]
    fn test_build_engine_attrs_options() {
        let config = Config {
            plugins: PluginsConfig {
                enabled: vec!["attrs".to_owned()],
            },
            attrs: AttrsConfig {
                left: "{{".to_owned(),
                right: "}}".to_owned(),
                allowed: None,
            },
            ..Config::default()
        };
        let engine = build_engine(&config).unwrap();
        assert_eq!(
            engine.render("# Title {{#top}}"),
            "<h1 id=\"top\">Title</h1>\n"
        );
    }

    #[test]
    fn test_build_engine_anchors_levels() {
        let config = Config {
            plugins: PluginsConfig {
                enabled: vec!["anchors".to_owned()],
            },
            anchors: AnchorsConfig {
                min_level: 2,
                max_level: 6,
            },
            ..Config::default()
        };
        let engine = build_engine(&config).unwrap();
        assert_eq!(
            engine.render("# One\n## Two"),
            "<h1>One</h1>\n<h2 id=\"two\">Two</h2>\n"
        );
    }

    #[test]
    fn test_build_engine_unknown_plugin() {
        let config = Config {
            plugins: PluginsConfig {
                enabled: vec!["emoji".to_owned()],
            },
            ..Config::default()
        };
        let err = build_engine(&config).unwrap_err();
        assert_eq!(err, RegistryError::UnknownPlugin("emoji".to_owned()));
    }
}
