//! IAM roles
//!
//! IAM refuses to delete a role that still has managed policies attached,
//! inline policies embedded, or instance profile memberships. All three are
//! cleared before the role delete.

use super::{FamilyHandler, Recorder, or_empty};
use crate::aws::{IamOperations, ProviderError};
use prod_teardown_common::tags::matches;
use prod_teardown_common::{
    DiscoveredResource, MatchStrategy, ProjectScope, ResourceFamily, ResourceKind, RunMode,
    TeardownOutcome,
};
use tracing::info;

const ROLE_MATCH: MatchStrategy = MatchStrategy::Name;

pub struct IdentityHandler<'a, P> {
    iam: &'a P,
}

impl<'a, P: IamOperations> IdentityHandler<'a, P> {
    pub fn new(iam: &'a P) -> Self {
        Self { iam }
    }

    async fn discover_attachments(
        &self,
        role: &str,
    ) -> Result<Vec<DiscoveredResource>, ProviderError> {
        let iam = self.iam;
        let mut attachments = Vec::new();

        let policies = or_empty(iam.list_attached_policies(role).await, "attached policies", role)?;
        attachments.extend(policies.into_iter().map(|arn| {
            let name = arn.rsplit('/').next().unwrap_or(&arn).to_string();
            DiscoveredResource::new(ResourceKind::AttachedPolicy, arn, name)
        }));

        let inline = or_empty(iam.list_inline_policies(role).await, "inline policies", role)?;
        attachments.extend(
            inline
                .into_iter()
                .map(|name| DiscoveredResource::new(ResourceKind::InlinePolicy, &name, &name)),
        );

        let profiles = or_empty(
            iam.list_instance_profiles(role).await,
            "instance profiles",
            role,
        )?;
        attachments.extend(
            profiles
                .into_iter()
                .map(|name| DiscoveredResource::new(ResourceKind::InstanceProfile, &name, &name)),
        );

        Ok(attachments)
    }
}

impl<P: IamOperations> FamilyHandler for IdentityHandler<'_, P> {
    fn family(&self) -> ResourceFamily {
        ResourceFamily::Identity
    }

    async fn discover(
        &self,
        scope: &ProjectScope,
    ) -> Result<Vec<DiscoveredResource>, ProviderError> {
        let mut found = Vec::new();
        let roles = or_empty(self.iam.list_roles().await, "list roles", "account")?;

        for role in roles {
            if !matches(ROLE_MATCH, &role, &Default::default(), scope) {
                continue;
            }
            let attachments = self.discover_attachments(&role).await?;
            found.push(
                DiscoveredResource::new(ResourceKind::IamRole, &role, &role)
                    .with_dependents(attachments),
            );
        }

        Ok(found)
    }

    async fn teardown(
        &self,
        role: &DiscoveredResource,
        mode: RunMode,
    ) -> Result<TeardownOutcome, ProviderError> {
        let mut rec = Recorder::new(self.family(), mode);
        let iam = self.iam;
        let role_name = role.id.as_str();

        if !rec.is_report_only() {
            info!(role = %role_name, "Tearing down IAM role");
        }

        for policy in role.dependents_of(ResourceKind::AttachedPolicy) {
            rec.remove(policy, || iam.detach_policy(role_name, &policy.id)).await?;
        }
        for policy in role.dependents_of(ResourceKind::InlinePolicy) {
            rec.remove(policy, || iam.delete_inline_policy(role_name, &policy.id))
                .await?;
        }
        for profile in role.dependents_of(ResourceKind::InstanceProfile) {
            rec.remove(profile, || {
                iam.remove_role_from_instance_profile(role_name, &profile.id)
            })
            .await?;
        }

        rec.remove(role, || iam.delete_role(role_name)).await?;

        Ok(rec.finish())
    }
}
