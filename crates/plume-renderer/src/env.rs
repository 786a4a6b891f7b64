//! Per-render environment shared by all rules of a single render call.

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Resolved link reference definition: `[label]: href "title"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkReference {
    pub href: String,
    pub title: Option<String>,
}

/// Mutable scratch state for one render call.
///
/// Created fresh by the engine for every render and dropped afterwards, so
/// concurrent renders never observe each other's state. Plugins keep their
/// own tables in typed extension slots:
///
/// ```
/// use plume_renderer::Env;
///
/// #[derive(Default)]
/// struct Counter(usize);
///
/// let mut env = Env::new();
/// env.get_or_default::<Counter>().0 += 1;
/// env.get_or_default::<Counter>().0 += 1;
/// assert_eq!(env.get::<Counter>().map(|c| c.0), Some(2));
/// ```
#[derive(Default)]
pub struct Env {
    references: HashMap<String, LinkReference>,
    extensions: HashMap<TypeId, Box<dyn Any + Send>>,
    warnings: Vec<String>,
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("references", &self.references)
            .field("extensions", &self.extensions.len())
            .field("warnings", &self.warnings)
            .finish()
    }
}

impl Env {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a link reference. The first definition of a label wins.
    pub fn define_reference(&mut self, label: String, reference: LinkReference) {
        self.references.entry(label).or_insert(reference);
    }

    /// Look up a link reference by normalized label.
    #[must_use]
    pub fn reference(&self, label: &str) -> Option<&LinkReference> {
        self.references.get(label)
    }

    /// Borrow an extension slot, if present.
    #[must_use]
    pub fn get<T: Any + Send>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref::<T>())
    }

    /// Mutably borrow an extension slot, if present.
    pub fn get_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.extensions
            .get_mut(&TypeId::of::<T>())
            .and_then(|b| b.downcast_mut::<T>())
    }

    /// Mutably borrow an extension slot, creating it with `T::default()`.
    pub fn get_or_default<T: Any + Send + Default>(&mut self) -> &mut T {
        self.extensions
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()))
            .downcast_mut::<T>()
            .unwrap_or_else(|| unreachable!("extension slot keyed by its own TypeId"))
    }

    /// Record a non-fatal diagnostic about the input.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub(crate) fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_reference_wins() {
        let mut env = Env::new();
        env.define_reference(
            "foo".to_owned(),
            LinkReference {
                href: "/a".to_owned(),
                title: None,
            },
        );
        env.define_reference(
            "foo".to_owned(),
            LinkReference {
                href: "/b".to_owned(),
                title: None,
            },
        );
        assert_eq!(env.reference("foo").map(|r| r.href.as_str()), Some("/a"));
    }

    #[test]
    fn test_extension_slots_are_typed() {
        #[derive(Default)]
        struct A(u8);
        #[derive(Default)]
        struct B(u8);

        let mut env = Env::new();
        env.get_or_default::<A>().0 = 1;
        assert!(env.get::<B>().is_none());
        assert_eq!(env.get::<A>().map(|a| a.0), Some(1));
    }

    #[test]
    fn test_warnings() {
        let mut env = Env::new();
        env.warn("unclosed container");
        assert_eq!(env.warnings(), &["unclosed container".to_owned()]);
        assert_eq!(env.take_warnings().len(), 1);
        assert!(env.warnings().is_empty());
    }
}
