//! Teardown outcomes and run summaries

use crate::family::ResourceFamily;
use crate::scope::RunMode;
use serde::Serialize;

/// A caught per-resource failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceError {
    pub resource_id: String,
    pub cause: String,
}

/// Result of one family's teardown pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownOutcome {
    pub family: ResourceFamily,
    /// Resources found (top-level and nested)
    pub discovered: usize,
    /// Destructive calls issued
    pub attempted: usize,
    /// Destructive calls that succeeded, or found the resource already gone
    pub deleted: usize,
    /// Failures, in the order they happened
    pub errors: Vec<ResourceError>,
}

impl TeardownOutcome {
    pub fn new(family: ResourceFamily) -> Self {
        Self {
            family,
            discovered: 0,
            attempted: 0,
            deleted: 0,
            errors: Vec::new(),
        }
    }

    /// Record a failure without counting a deletion attempt
    pub fn record_error(&mut self, resource_id: impl Into<String>, cause: impl ToString) {
        self.errors.push(ResourceError {
            resource_id: resource_id.into(),
            cause: cause.to_string(),
        });
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fold another outcome for the same family into this one
    pub fn merge(&mut self, other: TeardownOutcome) {
        debug_assert_eq!(self.family, other.family);
        self.discovered += other.discovered;
        self.attempted += other.attempted;
        self.deleted += other.deleted;
        self.errors.extend(other.errors);
    }
}

/// Outcomes of every family for one pass, in teardown order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub outcomes: Vec<TeardownOutcome>,
}

impl RunSummary {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            outcomes: Vec::new(),
        }
    }

    pub fn outcome(&self, family: ResourceFamily) -> Option<&TeardownOutcome> {
        self.outcomes.iter().find(|o| o.family == family)
    }

    pub fn total_discovered(&self) -> usize {
        self.outcomes.iter().map(|o| o.discovered).sum()
    }

    pub fn total_attempted(&self) -> usize {
        self.outcomes.iter().map(|o| o.attempted).sum()
    }

    pub fn total_deleted(&self) -> usize {
        self.outcomes.iter().map(|o| o.deleted).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.outcomes.iter().map(TeardownOutcome::failed).sum()
    }
}
