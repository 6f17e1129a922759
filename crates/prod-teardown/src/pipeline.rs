//! The two-pass teardown run
//!
//! Every run first walks all families in [`FAMILY_ORDER`] in ReportOnly mode
//! and prints what it found. Only after the confirmation gate agrees does the
//! same walk run again in the requested mode. Families run one at a time and
//! resources within a family one after another; a failure in one family is
//! recorded in its outcome and the next family still runs.

use crate::aws::CloudProvider;
use crate::config::OutputFormat;
use crate::confirm::ConfirmationGate;
use crate::families::{
    ComputeHandler, DatabaseHandler, FamilyHandler, FileSystemHandler, IdentityHandler,
    LoadBalancerHandler, NetworkHandler, ServerlessHandler,
};
use crate::report;
use crate::wait::WaitConfig;
use anyhow::{Context, Result};
use prod_teardown_common::{
    DiscoveredResource, FAMILY_ORDER, ProjectScope, ResourceFamily, RunMode, RunSummary,
    TeardownOutcome,
};
use std::io::{BufRead, Write};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Reporting,
    Executing,
    Done,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Both passes ran
    Completed {
        inventory: RunSummary,
        execution: RunSummary,
    },
    /// The operator declined; nothing was deleted
    Cancelled { inventory: RunSummary },
}

pub struct TeardownPipeline<'a, C> {
    cloud: &'a C,
    scope: &'a ProjectScope,
    wait: &'a WaitConfig,
    format: OutputFormat,
    state: PipelineState,
}

impl<'a, C: CloudProvider> TeardownPipeline<'a, C> {
    pub fn new(cloud: &'a C, scope: &'a ProjectScope, wait: &'a WaitConfig) -> Self {
        Self {
            cloud,
            scope,
            wait,
            format: OutputFormat::default(),
            state: PipelineState::Reporting,
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Report, confirm, then run the requested mode.
    ///
    /// Only a fatal provider error (bad credentials) or a failure to read the
    /// confirmation ends the run early.
    pub async fn run<R: BufRead, W: Write>(
        &mut self,
        requested: RunMode,
        gate: &mut ConfirmationGate<R, W>,
    ) -> Result<RunOutcome> {
        self.state = PipelineState::Reporting;
        info!(
            project = %self.scope.project_tag,
            region = %self.scope.region,
            "Discovering project resources"
        );
        let inventory = self.run_pass(RunMode::ReportOnly).await?;
        info!(
            discovered = inventory.total_discovered(),
            "Discovery complete"
        );

        if !gate
            .confirm(requested)
            .context("Failed to read confirmation")?
        {
            info!("Teardown cancelled, nothing was deleted");
            self.state = PipelineState::Done;
            return Ok(RunOutcome::Cancelled { inventory });
        }

        self.state = PipelineState::Executing;
        info!(mode = %requested, "Starting teardown");
        let execution = self.run_pass(requested).await?;
        self.state = PipelineState::Done;

        if execution.total_failed() > 0 {
            warn!(
                failed = execution.total_failed(),
                deleted = execution.total_deleted(),
                "Teardown finished with errors, rerun to retry"
            );
        } else {
            info!(deleted = execution.total_deleted(), "Teardown finished");
        }

        Ok(RunOutcome::Completed {
            inventory,
            execution,
        })
    }

    /// One walk over every family in teardown order
    async fn run_pass(&self, mode: RunMode) -> Result<RunSummary> {
        let mut summary = RunSummary::new(mode);
        let (cloud, wait) = (self.cloud, self.wait);

        for family in FAMILY_ORDER {
            let outcome = match family {
                ResourceFamily::Compute => {
                    self.run_handler(&ComputeHandler::new(cloud, wait), mode)
                        .await
                }
                ResourceFamily::LoadBalancer => {
                    self.run_handler(&LoadBalancerHandler::new(cloud, wait), mode)
                        .await
                }
                ResourceFamily::Database => {
                    self.run_handler(&DatabaseHandler::new(cloud), mode).await
                }
                ResourceFamily::FileSystem => {
                    self.run_handler(&FileSystemHandler::new(cloud, wait), mode)
                        .await
                }
                ResourceFamily::Serverless => {
                    self.run_handler(&ServerlessHandler::new(cloud), mode).await
                }
                ResourceFamily::Network => {
                    self.run_handler(&NetworkHandler::new(cloud), mode).await
                }
                ResourceFamily::Identity => {
                    self.run_handler(&IdentityHandler::new(cloud), mode).await
                }
            }
            .with_context(|| format!("{family} teardown aborted"))?;

            summary.outcomes.push(outcome);
        }

        Ok(summary)
    }

    async fn run_handler<H: FamilyHandler>(
        &self,
        handler: &H,
        mode: RunMode,
    ) -> Result<TeardownOutcome, crate::aws::ProviderError> {
        let family = handler.family();
        let resources = match handler.discover(self.scope).await {
            Ok(resources) => resources,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(family = %family, error = %e, "Discovery failed, treating family as empty");
                Vec::new()
            }
        };

        let mut outcome = TeardownOutcome::new(family);
        outcome.discovered = resources.iter().map(DiscoveredResource::total_count).sum();

        if mode.is_report_only() && !self.format.reserves_stdout() {
            report::print_inventory(family, &resources);
        }

        for resource in &resources {
            outcome.merge(handler.teardown(resource, mode).await?);
        }

        if !mode.is_report_only() && !outcome.is_clean() {
            warn!(
                family = %family,
                failed = outcome.failed(),
                "Some resources could not be deleted"
            );
        }

        Ok(outcome)
    }
}
