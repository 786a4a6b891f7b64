//! Setup-time configuration errors.

use crate::token::Phase;

/// Error composing rules or plugins into an engine.
///
/// These indicate a broken pipeline rather than a malformed document, so they
/// are reported at setup and never while rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// `before`/`after`/`replace` named a rule that is not registered.
    #[error("{phase} rule `{anchor}` not found")]
    AnchorNotFound {
        /// Phase of the registry that was searched.
        phase: Phase,
        /// Name of the missing anchor rule.
        anchor: String,
    },

    /// A rule with the same name is already registered in this phase.
    #[error("{phase} rule `{name}` is already registered")]
    DuplicateRule {
        /// Phase of the registry.
        phase: Phase,
        /// Conflicting rule name.
        name: String,
    },

    /// The same plugin was applied twice.
    #[error("plugin `{0}` is already applied")]
    PluginAlreadyApplied(String),

    /// A plugin was requested by a name nobody provides.
    #[error("unknown plugin `{0}`")]
    UnknownPlugin(String),
}
