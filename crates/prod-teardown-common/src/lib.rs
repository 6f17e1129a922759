//! prod-teardown-common - Shared types for project teardown
//!
//! This crate holds the provider-independent parts of a teardown run, with no
//! AWS SDK dependencies:
//!
//! - [`family`]: resource families, resource kinds and the fixed teardown order
//! - [`scope`]: the project scope and run mode
//! - [`tags`]: `Project` tag matching and the name-substring fallback
//! - [`resource`]: discovered resources and their dependents
//! - [`outcome`]: per-family teardown outcomes and run summaries
//! - [`defaults`]: default configuration values

pub mod defaults;
pub mod family;
pub mod outcome;
pub mod resource;
pub mod scope;
pub mod tags;

pub use family::{FAMILY_ORDER, ResourceFamily, ResourceKind};
pub use outcome::{ResourceError, RunSummary, TeardownOutcome};
pub use resource::DiscoveredResource;
pub use scope::{ProjectScope, RunMode};
pub use tags::{MatchStrategy, Tags};
