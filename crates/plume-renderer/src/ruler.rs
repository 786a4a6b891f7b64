//! Ordered registry of named parsing rules.
//!
//! Each phase (core, block, inline) owns one [`Ruler`]. Rules are tried in
//! registry order and the order itself is inspectable through
//! [`Ruler::names`], so plugin composition can be verified in tests.

use std::sync::Arc;

use crate::error::RegistryError;
use crate::token::Phase;

/// Rule handlers that carry their own name.
///
/// Implemented for the `dyn` rule traits so a [`Ruler`] can read the name of
/// a boxed handler.
pub trait NamedRule {
    fn rule_name(&self) -> &str;
}

/// Where to insert a rule relative to the existing ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Position {
    /// After all existing rules.
    Append,
    /// Before all existing rules.
    Prepend,
    /// Immediately before the named rule.
    Before(String),
    /// Immediately after the named rule.
    After(String),
    /// In place of the named rule.
    Replace(String),
}

/// Ordered collection of rules for one phase.
pub struct Ruler<R: ?Sized> {
    phase: Phase,
    rules: Vec<Arc<R>>,
}

impl<R: ?Sized + NamedRule> Ruler<R> {
    /// Create an empty ruler for a phase.
    #[must_use]
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            rules: Vec::new(),
        }
    }

    /// Create a ruler from rules with distinct names.
    pub(crate) fn with_rules(phase: Phase, rules: Vec<Box<R>>) -> Self {
        Self {
            phase,
            rules: rules.into_iter().map(Arc::from).collect(),
        }
    }

    /// Phase this ruler belongs to.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Insert a rule at the given position.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AnchorNotFound`] when the anchor of
    /// `Before`/`After`/`Replace` is not registered, and
    /// [`RegistryError::DuplicateRule`] when the rule's name is already taken
    /// (a `Replace` may reuse the name of the rule it replaces).
    pub fn insert(&mut self, position: Position, rule: Box<R>) -> Result<(), RegistryError> {
        let rule: Arc<R> = Arc::from(rule);
        let name = rule.rule_name().to_owned();
        let replaced = match &position {
            Position::Replace(anchor) => Some(anchor.as_str()),
            _ => None,
        };
        if self.contains(&name) && replaced != Some(name.as_str()) {
            return Err(RegistryError::DuplicateRule {
                phase: self.phase,
                name,
            });
        }

        match position {
            Position::Append => self.rules.push(rule),
            Position::Prepend => self.rules.insert(0, rule),
            Position::Before(anchor) => {
                let idx = self.require(&anchor)?;
                self.rules.insert(idx, rule);
            }
            Position::After(anchor) => {
                let idx = self.require(&anchor)?;
                self.rules.insert(idx + 1, rule);
            }
            Position::Replace(anchor) => {
                let idx = self.require(&anchor)?;
                self.rules[idx] = rule;
            }
        }
        Ok(())
    }

    /// Append a rule.
    pub fn push(&mut self, rule: Box<R>) -> Result<(), RegistryError> {
        self.insert(Position::Append, rule)
    }

    /// Prepend a rule.
    pub fn prepend(&mut self, rule: Box<R>) -> Result<(), RegistryError> {
        self.insert(Position::Prepend, rule)
    }

    /// Insert a rule immediately before `anchor`.
    pub fn before(&mut self, anchor: &str, rule: Box<R>) -> Result<(), RegistryError> {
        self.insert(Position::Before(anchor.to_owned()), rule)
    }

    /// Insert a rule immediately after `anchor`.
    pub fn after(&mut self, anchor: &str, rule: Box<R>) -> Result<(), RegistryError> {
        self.insert(Position::After(anchor.to_owned()), rule)
    }

    /// Replace the rule named `anchor`, keeping its position.
    pub fn replace(&mut self, anchor: &str, rule: Box<R>) -> Result<(), RegistryError> {
        self.insert(Position::Replace(anchor.to_owned()), rule)
    }

    /// Check whether a rule is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Effective rule order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.rule_name()).collect()
    }

    /// Iterate rules in order.
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.rules.iter().map(AsRef::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.rule_name() == name)
    }

    fn require(&self, anchor: &str) -> Result<usize, RegistryError> {
        self.position(anchor)
            .ok_or_else(|| RegistryError::AnchorNotFound {
                phase: self.phase,
                anchor: anchor.to_owned(),
            })
    }
}

/// Shares the rule handlers; the clone has its own order.
impl<R: ?Sized> Clone for Ruler<R> {
    fn clone(&self) -> Self {
        Self {
            phase: self.phase,
            rules: self.rules.clone(),
        }
    }
}

impl<R: ?Sized + NamedRule> std::fmt::Debug for Ruler<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ruler")
            .field("phase", &self.phase)
            .field("rules", &self.names())
            .finish()
    }
}
