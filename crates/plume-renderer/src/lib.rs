//! Composable markdown-to-HTML engine.
//!
//! Parsing runs in three phases, each driven by an ordered, named rule
//! registry ([`Ruler`]):
//!
//! - **Core**: whole-document passes (`normalize`, `block`, `inline`,
//!   `text_join`, plus plugin post-processing).
//! - **Block**: line-based rules producing the block token sequence.
//! - **Inline**: character-based rules producing the children of each
//!   block's `inline` token.
//!
//! Plugins ([`Plugin`]) insert, replace or reorder rules and register render
//! rules for their own token kinds. Composition happens once at setup; the
//! engine is then immutable and every render uses a fresh [`TokenStream`]
//! and [`Env`].
//!
//! # Example
//!
//! ```
//! use plume_renderer::{DelimitedRule, MarkdownEngine, Phase};
//!
//! let mut engine = MarkdownEngine::new();
//! engine
//!     .inline_mut()
//!     .after("emphasis", Box::new(DelimitedRule::new("sup", '^', 1).plain()))
//!     .unwrap();
//!
//! assert_eq!(engine.render("x^2^"), "<p>x<sup>2</sup></p>\n");
//! assert!(engine.rule_names(Phase::Inline).contains(&"sup"));
//! ```

pub mod attr_syntax;
mod block;
mod core_rules;
mod engine;
mod env;
mod error;
mod inline;
mod options;
mod plugin;
mod render;
mod ruler;
mod token;
mod util;

pub use block::{BlockRule, BlockState, MAX_BLOCK_NESTING, detect_fence};
pub use core_rules::{CoreRule, CoreState};
pub use engine::{MarkdownEngine, RenderResult};
pub use env::{Env, LinkReference};
pub use error::RegistryError;
pub use inline::{
    DelimitedRule, EmphasisRule, InlineRule, InlineState, MAX_INLINE_NESTING, find_closer,
    marker_run,
};
pub use options::RenderOptions;
pub use plugin::Plugin;
pub use render::{RenderContext, RenderRule, Renderer};
pub use ruler::{NamedRule, Position, Ruler};
pub use token::{Attrs, Nesting, Phase, Token, TokenId, TokenStream};
pub use util::{escape_html, escape_html_into, normalize_label, slugify, unescape};
