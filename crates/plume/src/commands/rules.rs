//! `rules` command implementation.

use std::path::PathBuf;

use clap::Args;
use plume_config::{CliSettings, Config};
use plume_renderer::{MarkdownEngine, Phase};

use super::build_engine;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the rules command.
#[derive(Args)]
pub(crate) struct RulesArgs {
    /// Path to configuration file (default: auto-discover plume.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Comma-separated plugin list, applied in order (overrides config).
    #[arg(short, long, value_delimiter = ',')]
    plugins: Option<Vec<String>>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl RulesArgs {
    /// Execute the rules command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or plugin composition fails.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            plugins: self.plugins,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let engine = build_engine(&config)?;

        for line in describe(&engine) {
            if line.ends_with(':') {
                output.heading(&line)?;
            } else {
                output.line(&line)?;
            }
        }
        Ok(())
    }
}

/// Listing of plugins and rules, one line each; section titles end with `:`.
fn describe(engine: &MarkdownEngine) -> Vec<String> {
    let mut lines = vec!["plugins:".to_owned()];
    lines.extend(engine.plugins().iter().map(|name| format!("  {name}")));
    for (title, phase) in [
        ("core:", Phase::Core),
        ("block:", Phase::Block),
        ("inline:", Phase::Inline),
    ] {
        lines.push(title.to_owned());
        lines.extend(
            engine
                .rule_names(phase)
                .iter()
                .enumerate()
                .map(|(i, name)| format!("  {:>2}. {name}", i + 1)),
        );
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use plume_plugins::MarkPlugin;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_describe() {
        let engine = MarkdownEngine::new().with_plugin(MarkPlugin).unwrap();
        let lines = describe(&engine);
        assert_eq!(lines[0], "plugins:");
        assert_eq!(lines[1], "  mark");
        assert_eq!(lines[2], "core:");
        assert_eq!(lines[3], "   1. normalize");
        assert!(lines.contains(&"   6. mark".to_owned()));
    }
}
