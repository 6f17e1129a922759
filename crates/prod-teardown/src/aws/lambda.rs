//! Lambda functions and the EventBridge rules that trigger them

use super::{AwsCloud, ProviderError, SdkField};
use prod_teardown_common::Tags;

/// The unpublished version every function has; deleted with the function
pub const LATEST_VERSION: &str = "$LATEST";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSummary {
    pub name: String,
    pub arn: String,
}

/// One target binding on an EventBridge rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTarget {
    pub id: String,
    pub arn: String,
}

/// Lambda and EventBridge operations used by the serverless family.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
pub trait ServerlessOperations: Send + Sync {
    async fn list_functions(&self) -> Result<Vec<FunctionSummary>, ProviderError>;

    async fn function_tags(&self, function_arn: &str) -> Result<Tags, ProviderError>;

    /// Every version of a function, `$LATEST` included
    async fn list_versions(&self, function_name: &str) -> Result<Vec<String>, ProviderError>;

    async fn delete_function_version(
        &self,
        function_name: &str,
        version: &str,
    ) -> Result<(), ProviderError>;

    async fn delete_function(&self, function_name: &str) -> Result<(), ProviderError>;

    /// Names of the rules with a target pointing at `target_arn`
    async fn list_rules_targeting(&self, target_arn: &str) -> Result<Vec<String>, ProviderError>;

    async fn list_rule_targets(&self, rule_name: &str) -> Result<Vec<RuleTarget>, ProviderError>;

    async fn remove_rule_target(&self, rule_name: &str, target_id: &str)
    -> Result<(), ProviderError>;

    async fn delete_rule(&self, rule_name: &str) -> Result<(), ProviderError>;
}

impl ServerlessOperations for AwsCloud {
    async fn list_functions(&self) -> Result<Vec<FunctionSummary>, ProviderError> {
        let mut functions = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let resp = self
                .lambda
                .list_functions()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(ProviderError::from_sdk)?;

            functions.extend(resp.functions().iter().filter_map(|f| {
                Some(FunctionSummary {
                    name: f.function_name()?.to_string(),
                    arn: f.function_arn()?.to_string(),
                })
            }));

            match resp.next_marker() {
                Some(m) => marker = Some(m.to_string()),
                None => break,
            }
        }

        Ok(functions)
    }

    async fn function_tags(&self, function_arn: &str) -> Result<Tags, ProviderError> {
        let resp = self
            .lambda
            .list_tags()
            .resource(function_arn)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;

        Ok(resp.tags().cloned().unwrap_or_default())
    }

    async fn list_versions(&self, function_name: &str) -> Result<Vec<String>, ProviderError> {
        let mut versions = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let resp = self
                .lambda
                .list_versions_by_function()
                .function_name(function_name)
                .set_marker(marker.take())
                .send()
                .await
                .map_err(ProviderError::from_sdk)?;

            versions.extend(
                resp.versions()
                    .iter()
                    .filter_map(|v| v.version())
                    .map(str::to_string),
            );

            match resp.next_marker() {
                Some(m) => marker = Some(m.to_string()),
                None => break,
            }
        }

        Ok(versions)
    }

    async fn delete_function_version(
        &self,
        function_name: &str,
        version: &str,
    ) -> Result<(), ProviderError> {
        self.lambda
            .delete_function()
            .function_name(function_name)
            .qualifier(version)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn delete_function(&self, function_name: &str) -> Result<(), ProviderError> {
        self.lambda
            .delete_function()
            .function_name(function_name)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn list_rules_targeting(&self, target_arn: &str) -> Result<Vec<String>, ProviderError> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let resp = self
                .events
                .list_rule_names_by_target()
                .target_arn(target_arn)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(ProviderError::from_sdk)?;

            names.extend(resp.rule_names().iter().cloned());

            match resp.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(names)
    }

    async fn list_rule_targets(&self, rule_name: &str) -> Result<Vec<RuleTarget>, ProviderError> {
        let resp = self
            .events
            .list_targets_by_rule()
            .rule(rule_name)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;

        Ok(resp
            .targets()
            .iter()
            .filter_map(|t| {
                Some(RuleTarget {
                    id: t.id().field()?.to_string(),
                    arn: t.arn().field()?.to_string(),
                })
            })
            .collect())
    }

    async fn remove_rule_target(
        &self,
        rule_name: &str,
        target_id: &str,
    ) -> Result<(), ProviderError> {
        self.events
            .remove_targets()
            .rule(rule_name)
            .ids(target_id)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn delete_rule(&self, rule_name: &str) -> Result<(), ProviderError> {
        self.events
            .delete_rule()
            .name(rule_name)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }
}
