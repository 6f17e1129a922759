//! Per-run scope and mode

use serde::Serialize;

/// Which project a run targets. Set once per run and handed to every handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectScope {
    /// Value of the `Project` tag (and the name substring for untaggable kinds)
    pub project_tag: String,
    /// AWS region the project lives in
    pub region: String,
}

impl ProjectScope {
    pub fn new(project_tag: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            project_tag: project_tag.into(),
            region: region.into(),
        }
    }
}

/// Whether a pass may mutate provider state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Discover and print only; never calls a mutating provider operation
    ReportOnly,
    /// Issue destructive calls
    Execute,
}

impl RunMode {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            RunMode::ReportOnly
        } else {
            RunMode::Execute
        }
    }

    pub fn is_report_only(self) -> bool {
        self == RunMode::ReportOnly
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::ReportOnly => f.write_str("DRY-RUN"),
            RunMode::Execute => f.write_str("EXECUTE"),
        }
    }
}
