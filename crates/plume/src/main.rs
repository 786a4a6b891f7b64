//! Plume CLI - Markdown renderer with composable syntax plugins.
//!
//! Provides commands for:
//! - `render`: Render a markdown file (or stdin) to HTML
//! - `rules`: Print the applied plugins and the effective rule order

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{RenderArgs, RulesArgs};
use output::Output;

/// Plume - Markdown renderer.
#[derive(Parser)]
#[command(name = "plume", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render markdown to HTML.
    Render(RenderArgs),
    /// Show applied plugins and rule order per phase.
    Rules(RulesArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = match &cli.command {
        Commands::Render(args) => args.verbose,
        Commands::Rules(args) => args.verbose,
    };

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render(args) => args.execute(&output),
        Commands::Rules(args) => args.execute(&output),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
