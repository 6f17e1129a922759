//! Bounded polling for asynchronous deletions.
//!
//! Several deletes return before the provider has finished (ECS services
//! draining, load balancers releasing their target groups, EFS mount targets
//! detaching). The handler that issued the delete polls here until the
//! resource reaches a terminal state or the timeout elapses.

use crate::aws::ProviderError;
use backon::{BackoffBuilder, ConstantBuilder};
use prod_teardown_common::defaults::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_WAIT_TIMEOUT_SECS};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Polling cadence and budget for one wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    /// Fixed delay between status checks
    pub poll_interval: Duration,
    /// Maximum total time to wait before giving up
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS),
        }
    }
}

impl WaitConfig {
    /// Upper bound on status checks for this budget
    fn max_polls(&self) -> usize {
        if self.poll_interval.is_zero() {
            return 1;
        }
        let polls = self.timeout.as_millis() / self.poll_interval.as_millis().max(1);
        usize::try_from(polls).unwrap_or(usize::MAX).saturating_add(1)
    }
}

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The resource reached a terminal state or is no longer reported
    Deleted,
    /// The budget elapsed first; the caller logs and carries on
    TimedOut,
}

/// Poll until `poll` reports the resource gone.
///
/// `poll` returns `Ok(true)` once the resource is terminal. A not-found error
/// counts as terminal, transient errors are logged and polling continues,
/// and fatal errors propagate.
pub async fn wait_until_terminal<F, Fut>(
    resource_id: &str,
    poll: F,
    config: &WaitConfig,
) -> Result<WaitOutcome, ProviderError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<bool, ProviderError>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    let mut delays = ConstantBuilder::default()
        .with_delay(config.poll_interval)
        .with_max_times(config.max_polls())
        .build();

    loop {
        attempts += 1;

        match poll().await {
            Ok(true) => {
                debug!(resource = %resource_id, attempts, "Deletion complete");
                return Ok(WaitOutcome::Deleted);
            }
            Ok(false) => {}
            Err(e) if e.is_not_found() => {
                debug!(resource = %resource_id, attempts, "Resource no longer reported");
                return Ok(WaitOutcome::Deleted);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(resource = %resource_id, error = %e, "Status check failed, will retry");
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= config.timeout {
            warn!(
                resource = %resource_id,
                timeout_secs = config.timeout.as_secs(),
                attempts,
                "Timed out waiting for deletion, continuing"
            );
            return Ok(WaitOutcome::TimedOut);
        }

        let Some(delay) = delays.next() else {
            warn!(resource = %resource_id, attempts, "Poll budget exhausted, continuing");
            return Ok(WaitOutcome::TimedOut);
        };
        let delay = delay.min(config.timeout - elapsed);
        debug!(
            resource = %resource_id,
            attempt = attempts,
            delay_ms = delay.as_millis(),
            "Deletion still in progress"
        );
        tokio::time::sleep(delay).await;
    }
}
