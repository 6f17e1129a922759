//! IAM roles and what keeps them from being deleted

use super::{AwsCloud, ProviderError, SdkField};

/// Trait for IAM operations that can be mocked in tests.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait IamOperations: Send + Sync {
    /// Names of every role in the account
    async fn list_roles(&self) -> Result<Vec<String>, ProviderError>;

    /// ARNs of managed policies attached to a role
    async fn list_attached_policies(&self, role_name: &str) -> Result<Vec<String>, ProviderError>;

    async fn detach_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), ProviderError>;

    /// Names of inline policies embedded in a role
    async fn list_inline_policies(&self, role_name: &str) -> Result<Vec<String>, ProviderError>;

    async fn delete_inline_policy(&self, role_name: &str, policy_name: &str)
    -> Result<(), ProviderError>;

    /// Names of instance profiles the role belongs to
    async fn list_instance_profiles(&self, role_name: &str) -> Result<Vec<String>, ProviderError>;

    async fn remove_role_from_instance_profile(
        &self,
        role_name: &str,
        profile_name: &str,
    ) -> Result<(), ProviderError>;

    async fn delete_role(&self, role_name: &str) -> Result<(), ProviderError>;
}

impl IamOperations for AwsCloud {
    async fn list_roles(&self) -> Result<Vec<String>, ProviderError> {
        let mut roles = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let resp = self
                .iam
                .list_roles()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(ProviderError::from_sdk)?;

            roles.extend(
                resp.roles()
                    .iter()
                    .filter_map(|r| r.role_name().field())
                    .map(str::to_string),
            );

            if resp.is_truncated() {
                marker = resp.marker().map(|s| s.to_string());
                if marker.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        Ok(roles)
    }

    async fn list_attached_policies(&self, role_name: &str) -> Result<Vec<String>, ProviderError> {
        let mut arns = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let resp = self
                .iam
                .list_attached_role_policies()
                .role_name(role_name)
                .set_marker(marker.take())
                .send()
                .await
                .map_err(ProviderError::from_sdk)?;

            arns.extend(
                resp.attached_policies()
                    .iter()
                    .filter_map(|p| p.policy_arn())
                    .map(str::to_string),
            );

            if resp.is_truncated() {
                marker = resp.marker().map(|s| s.to_string());
                if marker.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        Ok(arns)
    }

    async fn detach_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), ProviderError> {
        self.iam
            .detach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn list_inline_policies(&self, role_name: &str) -> Result<Vec<String>, ProviderError> {
        let resp = self
            .iam
            .list_role_policies()
            .role_name(role_name)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;

        Ok(resp.policy_names().to_vec())
    }

    async fn delete_inline_policy(
        &self,
        role_name: &str,
        policy_name: &str,
    ) -> Result<(), ProviderError> {
        self.iam
            .delete_role_policy()
            .role_name(role_name)
            .policy_name(policy_name)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn list_instance_profiles(&self, role_name: &str) -> Result<Vec<String>, ProviderError> {
        let resp = self
            .iam
            .list_instance_profiles_for_role()
            .role_name(role_name)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;

        Ok(resp
            .instance_profiles()
            .iter()
            .filter_map(|p| p.instance_profile_name().field())
            .map(str::to_string)
            .collect())
    }

    async fn remove_role_from_instance_profile(
        &self,
        role_name: &str,
        profile_name: &str,
    ) -> Result<(), ProviderError> {
        self.iam
            .remove_role_from_instance_profile()
            .role_name(role_name)
            .instance_profile_name(profile_name)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn delete_role(&self, role_name: &str) -> Result<(), ProviderError> {
        self.iam
            .delete_role()
            .role_name(role_name)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }
}
