//! CLI error types.

use plume_config::ConfigError;
use plume_renderer::RegistryError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Plugin composition failed: {0}")]
    Registry(#[from] RegistryError),
}
