//! Default configuration values for teardown runs

/// Region the project is deployed to unless `--region` says otherwise
pub const DEFAULT_REGION: &str = "us-west-2";

/// Project tag value unless `--project-tag` says otherwise
pub const DEFAULT_PROJECT_TAG: &str = "prod-e";

/// Seconds between status polls while waiting on an asynchronous deletion
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Upper bound in seconds on any single wait (load balancer deletion, service
/// drain, mount target removal)
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 600;

/// The literal an operator must type to let the execution pass run
pub const CONFIRMATION_TOKEN: &str = "yes";
