//! Per-family discovery and ordered teardown
//!
//! Each handler owns one [`ResourceFamily`]: it finds the project's live
//! resources, nests their children in removal order, and removes them
//! child-first. Provider errors are caught per resource and recorded in the
//! family outcome; only [`ProviderError::Fatal`] escapes a handler.

pub mod compute;
pub mod database;
pub mod filesystem;
pub mod identity;
pub mod load_balancer;
pub mod network;
pub mod serverless;

pub use compute::ComputeHandler;
pub use database::DatabaseHandler;
pub use filesystem::FileSystemHandler;
pub use identity::IdentityHandler;
pub use load_balancer::LoadBalancerHandler;
pub use network::NetworkHandler;
pub use serverless::ServerlessHandler;

use crate::aws::ProviderError;
use prod_teardown_common::{
    DiscoveredResource, ProjectScope, ResourceFamily, RunMode, TeardownOutcome,
};
use std::future::Future;
use tracing::{debug, info, warn};

/// Discovery and teardown for one resource family.
#[allow(async_fn_in_trait)] // Internal use only
pub trait FamilyHandler {
    fn family(&self) -> ResourceFamily;

    /// Find the project's resources with their dependents. Read-only.
    async fn discover(&self, scope: &ProjectScope)
    -> Result<Vec<DiscoveredResource>, ProviderError>;

    /// Remove one discovered resource and its dependents, child-first.
    /// In ReportOnly mode no mutating call is issued.
    async fn teardown(
        &self,
        resource: &DiscoveredResource,
        mode: RunMode,
    ) -> Result<TeardownOutcome, ProviderError>;
}

/// Treat a failed discovery sub-step as having found nothing.
pub(crate) fn or_empty<T: Default>(
    result: Result<T, ProviderError>,
    step: &str,
    parent: &str,
) -> Result<T, ProviderError> {
    match result {
        Ok(found) => Ok(found),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(step, parent = %parent, error = %e, "Discovery failed, treating as empty");
            Ok(T::default())
        }
    }
}

/// Issues the destructive calls for one resource tree and tallies them.
pub(crate) struct Recorder {
    mode: RunMode,
    outcome: TeardownOutcome,
}

impl Recorder {
    pub(crate) fn new(family: ResourceFamily, mode: RunMode) -> Self {
        Self {
            mode,
            outcome: TeardownOutcome::new(family),
        }
    }

    pub(crate) fn is_report_only(&self) -> bool {
        self.mode.is_report_only()
    }

    /// Issue a destructive call (delete, deregister, detach, disassociate).
    ///
    /// Counts as attempted. Success or not-found counts as deleted; any
    /// other non-fatal error is recorded against the resource. Returns
    /// whether the resource is now gone.
    pub(crate) async fn remove<F, Fut>(
        &mut self,
        resource: &DiscoveredResource,
        call: F,
    ) -> Result<bool, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ProviderError>>,
    {
        if self.is_report_only() {
            debug!(kind = %resource.kind, id = %resource.id, "[DRY RUN] Would delete");
            return Ok(false);
        }

        self.outcome.attempted += 1;
        match call().await {
            Ok(()) => {
                info!(kind = %resource.kind, id = %resource.id, "Deleted");
                self.outcome.deleted += 1;
                Ok(true)
            }
            Err(e) if e.is_not_found() => {
                debug!(kind = %resource.kind, id = %resource.id, "Already deleted");
                self.outcome.deleted += 1;
                Ok(true)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(kind = %resource.kind, id = %resource.id, error = %e, "Failed to delete");
                self.outcome.record_error(&resource.id, &e);
                Ok(false)
            }
        }
    }

    /// Issue a preparatory call (scale down, revoke rules, remove a target).
    ///
    /// Not counted as a deletion; failures are still recorded. Returns
    /// whether the call succeeded.
    pub(crate) async fn prepare<F, Fut>(
        &mut self,
        resource_id: &str,
        action: &str,
        call: F,
    ) -> Result<bool, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ProviderError>>,
    {
        if self.is_report_only() {
            debug!(id = %resource_id, action, "[DRY RUN] Would run");
            return Ok(false);
        }

        match call().await {
            Ok(()) => {
                debug!(id = %resource_id, action, "Done");
                Ok(true)
            }
            Err(e) if e.is_not_found() => Ok(true),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(id = %resource_id, action, error = %e, "Preparatory step failed");
                self.outcome.record_error(resource_id, format!("{action}: {e}"));
                Ok(false)
            }
        }
    }

    pub(crate) fn finish(self) -> TeardownOutcome {
        self.outcome
    }
}
