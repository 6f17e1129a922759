//! Credential preflight

use anyhow::{Context, Result, bail};
use tracing::info;

/// Strongly-typed AWS account ID (12-digit string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display, derive_more::Deref)]
pub struct AccountId(String);

impl AccountId {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.len() != 12 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            bail!("Malformed AWS account ID: {raw:?}");
        }
        Ok(AccountId(raw.to_string()))
    }
}

/// Who the run is acting as
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub account: AccountId,
    /// Principal ARN, e.g. `arn:aws:sts::123456789012:assumed-role/ops/alice`
    pub arn: String,
}

/// Resolve the caller via STS GetCallerIdentity.
///
/// Needs no permissions, so a failure here means the credentials themselves
/// are missing or invalid. Called once before any discovery.
pub async fn caller_identity(config: &aws_config::SdkConfig) -> Result<CallerIdentity> {
    let resp = aws_sdk_sts::Client::new(config)
        .get_caller_identity()
        .send()
        .await
        .context("STS GetCallerIdentity failed - check credentials")?;

    let account = resp
        .account()
        .context("STS returned no account ID")
        .and_then(AccountId::parse)?;
    let arn = resp.arn().unwrap_or_default().to_string();

    info!(account_id = %account, principal = %arn, "Credentials validated");
    Ok(CallerIdentity { account, arn })
}
