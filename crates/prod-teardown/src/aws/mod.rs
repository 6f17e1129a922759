//! AWS service operations for the teardown
//!
//! One operations trait per service, all implemented by [`AwsCloud`]:
//! - ECS: clusters, services, task definitions
//! - ELBv2: load balancers, listeners, rules, target groups
//! - RDS: DB instances and subnet groups
//! - EFS: filesystems, mount targets, access points
//! - Lambda and EventBridge: functions, versions, trigger rules
//! - EC2: VPCs and their networking
//! - IAM: roles
//!
//! Every call returns [`ProviderError`]. List calls page through the full
//! result set and return plain records, so the family handlers never see SDK
//! types.

pub mod account;
pub mod context;
pub mod ec2;
pub mod ecs;
pub mod efs;
pub mod elb;
pub mod error;
pub mod iam;
pub mod lambda;
pub mod rds;

pub use account::{AccountId, CallerIdentity, caller_identity};
pub use context::{AwsContext, FromAwsContext};
pub use ec2::NetworkOperations;
pub use ecs::EcsOperations;
pub use efs::EfsOperations;
pub use elb::ElbOperations;
pub use error::{ProviderError, classify_aws_error, ignore_not_found};
pub use iam::IamOperations;
pub use lambda::ServerlessOperations;
pub use rds::RdsOperations;

use prod_teardown_common::Tags;

/// Everything the teardown pipeline needs from a cloud provider.
pub trait CloudProvider:
    EcsOperations
    + ElbOperations
    + RdsOperations
    + EfsOperations
    + ServerlessOperations
    + NetworkOperations
    + IamOperations
{
}

impl<T> CloudProvider for T where
    T: EcsOperations
        + ElbOperations
        + RdsOperations
        + EfsOperations
        + ServerlessOperations
        + NetworkOperations
        + IamOperations
{
}

/// SDK-backed provider: one client per service, all from the same config.
pub struct AwsCloud {
    pub(crate) ecs: aws_sdk_ecs::Client,
    pub(crate) elb: aws_sdk_elasticloadbalancingv2::Client,
    pub(crate) rds: aws_sdk_rds::Client,
    pub(crate) efs: aws_sdk_efs::Client,
    pub(crate) lambda: aws_sdk_lambda::Client,
    pub(crate) events: aws_sdk_eventbridge::Client,
    pub(crate) ec2: aws_sdk_ec2::Client,
    pub(crate) iam: aws_sdk_iam::Client,
}

impl FromAwsContext for AwsCloud {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            ecs: ctx.ecs_client(),
            elb: ctx.elb_client(),
            rds: ctx.rds_client(),
            efs: ctx.efs_client(),
            lambda: ctx.lambda_client(),
            events: ctx.eventbridge_client(),
            ec2: ctx.ec2_client(),
            iam: ctx.iam_client(),
        }
    }
}

/// SDK getters return `&str` for fields the service model marks required and
/// `Option<&str>` otherwise. This folds both shapes into an `Option`.
pub(crate) trait SdkField<'a, T: ?Sized> {
    fn field(self) -> Option<&'a T>;
}

impl<'a, T: ?Sized> SdkField<'a, T> for &'a T {
    fn field(self) -> Option<&'a T> {
        Some(self)
    }
}

impl<'a, T: ?Sized> SdkField<'a, T> for Option<&'a T> {
    fn field(self) -> Option<&'a T> {
        self
    }
}

/// Extract tags from an AWS tag list using accessor functions.
pub(crate) fn extract_tags<T>(
    tags: &[T],
    key_fn: impl Fn(&T) -> Option<&str>,
    value_fn: impl Fn(&T) -> Option<&str>,
) -> Tags {
    tags.iter()
        .filter_map(|t| Some((key_fn(t)?.to_string(), value_fn(t)?.to_string())))
        .collect()
}
