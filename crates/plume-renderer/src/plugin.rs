//! Plugin composition.

use crate::engine::MarkdownEngine;
use crate::error::RegistryError;

/// A named bundle of rule registrations.
///
/// Plugins are applied once, at setup, in the order given; later plugins see
/// the registries as left by earlier ones, so anchors like
/// `before("emphasis")` resolve against the current order.
///
/// # Example
///
/// ```
/// use plume_renderer::{DelimitedRule, MarkdownEngine, Plugin, RegistryError};
///
/// struct Highlight;
///
/// impl Plugin for Highlight {
///     fn name(&self) -> &str { "highlight" }
///
///     fn register(&self, engine: &mut MarkdownEngine) -> Result<(), RegistryError> {
///         engine.inline_mut().before(
///             "emphasis",
///             Box::new(DelimitedRule::new("highlight", '=', 2).with_tag("span")),
///         )
///     }
/// }
///
/// let engine = MarkdownEngine::new().with_plugin(Highlight)?;
/// assert_eq!(engine.render("==x=="), "<p><span>x</span></p>\n");
/// # Ok::<(), RegistryError>(())
/// ```
pub trait Plugin {
    /// Name used to detect double application.
    fn name(&self) -> &str;

    /// Register rules on the engine.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] when an anchor rule is missing or a rule
    /// name is already taken.
    fn register(&self, engine: &mut MarkdownEngine) -> Result<(), RegistryError>;
}

impl<P: Plugin + ?Sized> Plugin for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn register(&self, engine: &mut MarkdownEngine) -> Result<(), RegistryError> {
        (**self).register(engine)
    }
}
