//! Configuration management for plume.
//!
//! Parses `plume.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! ```toml
//! [render]
//! html_escaping = true
//! breaks = false
//! raw_html = false
//! xhtml_out = false
//! lang_prefix = "language-"
//!
//! [plugins]
//! enabled = ["attrs", "div", "mark", "sub", "sup", "ins", "abbr"]
//!
//! [attrs]
//! left = "{"
//! right = "}"
//! allowed = ["id", "class"]
//!
//! [anchors]
//! min_level = 1
//! max_level = 6
//! ```
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `render.lang_prefix`
//! - `attrs.left`
//! - `attrs.right`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

use plume_plugins::{DEFAULT_PLUGINS, PLUGIN_NAMES};
use plume_renderer::RenderOptions;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override raw HTML recognition.
    pub raw_html: Option<bool>,
    /// Override soft break rendering.
    pub breaks: Option<bool>,
    /// Override XHTML-style self-closing tags.
    pub xhtml_out: Option<bool>,
    /// Replace the enabled plugin list.
    pub plugins: Option<Vec<String>>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "plume.toml";

/// Highest heading level.
const MAX_HEADING_LEVEL: u8 = 6;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Render options.
    pub render: RenderOptions,
    /// Plugin composition.
    pub plugins: PluginsConfig,
    /// Options of the `attrs` plugin.
    pub attrs: AttrsConfig,
    /// Options of the `anchors` plugin.
    pub anchors: AnchorsConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Plugin composition.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Plugin names, applied in order.
    pub enabled: Vec<String>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_PLUGINS.iter().map(|&name| name.to_owned()).collect(),
        }
    }
}

/// Attribute syntax options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AttrsConfig {
    /// Left delimiter.
    pub left: String,
    /// Right delimiter.
    pub right: String,
    /// Attribute names that may be attached (all when unset).
    pub allowed: Option<Vec<String>>,
}

impl Default for AttrsConfig {
    fn default() -> Self {
        Self {
            left: "{".to_owned(),
            right: "}".to_owned(),
            allowed: None,
        }
    }
}

/// Heading anchor options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AnchorsConfig {
    /// Lowest heading level that gets an id.
    pub min_level: u8,
    /// Highest heading level that gets an id.
    pub max_level: u8,
}

impl Default for AnchorsConfig {
    fn default() -> Self {
        Self {
            min_level: 1,
            max_level: MAX_HEADING_LEVEL,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`render.lang_prefix`").
        field: String,
        /// Error message (e.g., "${`PLUME_LANG_PREFIX`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `plume.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading, allowing CLI arguments to take
    /// precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(raw_html) = settings.raw_html {
            self.render.raw_html = raw_html;
        }
        if let Some(breaks) = settings.breaks {
            self.render.breaks = breaks;
        }
        if let Some(xhtml_out) = settings.xhtml_out {
            self.render.xhtml_out = xhtml_out;
        }
        if let Some(plugins) = &settings.plugins {
            self.plugins.enabled.clone_from(plugins);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::discover_from(current)
    }

    /// Search for config file in `dir` and its parents.
    fn discover_from(mut dir: PathBuf) -> Option<PathBuf> {
        loop {
            let candidate = dir.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;
        config.config_path = Some(path.to_path_buf());

        // Validate configuration after loading and expansion
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after applying CLI
    /// settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_plugins()?;
        self.validate_attrs()?;
        self.validate_anchors()?;
        Ok(())
    }

    /// Validate plugin names: known and listed once.
    fn validate_plugins(&self) -> Result<(), ConfigError> {
        for (i, name) in self.plugins.enabled.iter().enumerate() {
            if !PLUGIN_NAMES.contains(&name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "plugins.enabled: unknown plugin `{name}` (known: {})",
                    PLUGIN_NAMES.join(", ")
                )));
            }
            if self.plugins.enabled[..i].contains(name) {
                return Err(ConfigError::Validation(format!(
                    "plugins.enabled: `{name}` is listed twice"
                )));
            }
        }
        Ok(())
    }

    /// Validate attribute delimiters.
    fn validate_attrs(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.attrs.left, "attrs.left")?;
        require_non_empty(&self.attrs.right, "attrs.right")?;
        Ok(())
    }

    /// Validate the anchored heading level range.
    fn validate_anchors(&self) -> Result<(), ConfigError> {
        let AnchorsConfig {
            min_level,
            max_level,
        } = self.anchors;
        if min_level == 0 || max_level > MAX_HEADING_LEVEL || min_level > max_level {
            return Err(ConfigError::Validation(format!(
                "anchors: levels must satisfy 1 <= min_level <= max_level <= {MAX_HEADING_LEVEL}"
            )));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.render.lang_prefix =
            expand::expand_env(&self.render.lang_prefix, "render.lang_prefix")?;
        self.attrs.left = expand::expand_env(&self.attrs.left, "attrs.left")?;
        self.attrs.right = expand::expand_env(&self.attrs.right, "attrs.right")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.render, RenderOptions::default());
        assert_eq!(config.plugins.enabled, DEFAULT_PLUGINS);
        assert_eq!(config.attrs.left, "{");
        assert_eq!(config.attrs.right, "}");
        assert!(config.attrs.allowed.is_none());
        assert_eq!(config.anchors.min_level, 1);
        assert_eq!(config.anchors.max_level, 6);
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.render, RenderOptions::default());
        assert_eq!(config.plugins.enabled, DEFAULT_PLUGINS);
    }

    #[test]
    fn test_parse_render_config() {
        let toml = r#"
[render]
breaks = true
lang_prefix = "lang-"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.render.breaks);
        assert!(config.render.html_escaping);
        assert_eq!(config.render.lang_prefix, "lang-");
    }

    #[test]
    fn test_parse_plugins_and_options() {
        let toml = r#"
[plugins]
enabled = ["mark", "attrs", "anchors"]

[attrs]
left = "{{"
right = "}}"
allowed = ["id"]

[anchors]
min_level = 2
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.plugins.enabled, vec!["mark", "attrs", "anchors"]);
        assert_eq!(config.attrs.left, "{{");
        assert_eq!(config.attrs.allowed, Some(vec!["id".to_owned()]));
        assert_eq!(config.anchors.min_level, 2);
        assert_eq!(config.anchors.max_level, 6);
        config.validate().unwrap();
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default();
        config.apply_cli_settings(&CliSettings {
            raw_html: Some(true),
            breaks: Some(true),
            xhtml_out: None,
            plugins: Some(vec!["mark".to_owned()]),
        });
        assert!(config.render.raw_html);
        assert!(config.render.breaks);
        assert!(!config.render.xhtml_out);
        assert_eq!(config.plugins.enabled, vec!["mark"]);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default();
        config.apply_cli_settings(&CliSettings::default());
        assert_eq!(config.render, RenderOptions::default());
        assert_eq!(config.plugins.enabled, DEFAULT_PLUGINS);
    }

    #[test]
    fn test_validate_default_config_passes() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_validate_unknown_plugin() {
        let mut config = Config::default();
        config.plugins.enabled.push("footnote".to_owned());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unknown plugin `footnote`"));
    }

    #[test]
    fn test_validate_duplicate_plugin() {
        let mut config = Config::default();
        config.plugins.enabled.push("mark".to_owned());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("`mark` is listed twice"));
    }

    #[test]
    fn test_validate_empty_delimiter() {
        let mut config = Config::default();
        config.attrs.right = String::new();
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: attrs.right cannot be empty"
        );
    }

    #[test]
    fn test_validate_anchor_levels() {
        let mut config = Config::default();
        config.anchors.min_level = 4;
        config.anchors.max_level = 2;
        assert!(config.validate().is_err());
        config.anchors.min_level = 0;
        config.anchors.max_level = 6;
        assert!(config.validate().is_err());
        config.anchors.min_level = 1;
        config.anchors.max_level = 7;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[render]\nraw_html = true\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();
        assert!(config.render.raw_html);
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plume.toml");
        std::fs::write(&path, "[render\n").unwrap();
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_validates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plume.toml");
        std::fs::write(&path, "[plugins]\nenabled = [\"nope\"]\n").unwrap();
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_validates_cli_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plume.toml");
        std::fs::write(&path, "").unwrap();
        let settings = CliSettings {
            plugins: Some(vec!["bogus".to_owned()]),
            ..CliSettings::default()
        };
        let err = Config::load(Some(&path), Some(&settings)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_discover_from_parent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "").unwrap();

        let found = Config::discover_from(nested).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILENAME));
    }

    #[test]
    fn test_expand_env_vars_lang_prefix() {
        let toml = r#"
[render]
lang_prefix = "${PLUME_CONFIG_TEST_PREFIX:-hl-}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();
        assert_eq!(config.render.lang_prefix, "hl-");
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        let toml = r#"
[attrs]
left = "${PLUME_CONFIG_TEST_MISSING}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("attrs.left"));
    }
}
