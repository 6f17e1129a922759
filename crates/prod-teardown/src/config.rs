//! Configuration types for a teardown run

use crate::wait::WaitConfig;
use prod_teardown_common::{ProjectScope, RunMode};
use std::time::Duration;

/// How the final summary is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Indented inventory and a summary table
    #[default]
    Table,
    /// Only the run outcome, as JSON on stdout
    Json,
}

impl OutputFormat {
    /// Whether stdout carries only the final document, so prompts and
    /// inventory must go elsewhere or be skipped
    pub fn reserves_stdout(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// What to tear down and where
#[derive(Debug, Clone)]
pub struct TargetConfig {
    /// AWS region
    pub region: String,
    /// Value of the `Project` tag the resources carry
    pub project_tag: String,
    /// AWS profile name (overrides default credential resolution)
    pub aws_profile: Option<String>,
}

/// Waits on asynchronous deletions
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Seconds between status polls
    pub poll_interval_secs: u64,
    /// Upper bound in seconds on any single wait
    pub wait_timeout_secs: u64,
}

/// Configuration for a teardown run
#[derive(Debug, Clone)]
pub struct TeardownConfig {
    pub target: TargetConfig,
    pub polling: PollingConfig,
    /// Report only, never delete
    pub dry_run: bool,
    pub format: OutputFormat,
}

impl TeardownConfig {
    pub fn scope(&self) -> ProjectScope {
        ProjectScope::new(&self.target.project_tag, &self.target.region)
    }

    pub fn mode(&self) -> RunMode {
        RunMode::from_dry_run(self.dry_run)
    }

    pub fn wait(&self) -> WaitConfig {
        WaitConfig {
            poll_interval: Duration::from_secs(self.polling.poll_interval_secs),
            timeout: Duration::from_secs(self.polling.wait_timeout_secs),
        }
    }

    pub fn region(&self) -> &str {
        &self.target.region
    }

    pub fn aws_profile(&self) -> Option<&str> {
        self.target.aws_profile.as_deref()
    }
}
