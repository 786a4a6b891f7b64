//! `render` command implementation.

use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use plume_config::{CliSettings, Config};

use super::build_engine;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown file to render (stdin when omitted or `-`).
    file: Option<PathBuf>,

    /// Write HTML to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover plume.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Recognize raw HTML in the source.
    #[arg(long)]
    raw_html: bool,

    /// Render soft line breaks as `<br>`.
    #[arg(long)]
    breaks: bool,

    /// Use XHTML-style self-closing tags.
    #[arg(long)]
    xhtml: bool,

    /// Comma-separated plugin list, applied in order (overrides config).
    #[arg(short, long, value_delimiter = ',')]
    plugins: Option<Vec<String>>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, plugin composition or I/O
    /// fails.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            raw_html: self.raw_html.then_some(true),
            breaks: self.breaks.then_some(true),
            xhtml_out: self.xhtml.then_some(true),
            plugins: self.plugins,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            tracing::info!(path = %path.display(), "Loaded configuration");
        }
        let engine = build_engine(&config)?;

        let input = match self.file.as_deref() {
            Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)?,
            _ => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            }
        };

        let result = engine.render_document(&input);
        for warning in &result.warnings {
            output.warning(&format!("Warning: {warning}"));
        }

        match &self.output {
            Some(path) => {
                std::fs::write(path, &result.html)?;
                output.info(&format!("Wrote {}", path.display()));
            }
            None => output.write(&result.html)?,
        }
        Ok(())
    }
}
