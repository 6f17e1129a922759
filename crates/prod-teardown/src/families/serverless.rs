//! Lambda functions and the EventBridge rules that invoke them

use super::{FamilyHandler, Recorder, or_empty};
use crate::aws::lambda::LATEST_VERSION;
use crate::aws::{ProviderError, ServerlessOperations};
use prod_teardown_common::tags::matches;
use prod_teardown_common::{
    DiscoveredResource, MatchStrategy, ProjectScope, ResourceFamily, ResourceKind, RunMode,
    TeardownOutcome,
};
use tracing::info;

const FUNCTION_MATCH: MatchStrategy = MatchStrategy::TagOrName;

pub struct ServerlessHandler<'a, P> {
    functions: &'a P,
}

impl<'a, P: ServerlessOperations> ServerlessHandler<'a, P> {
    pub fn new(functions: &'a P) -> Self {
        Self { functions }
    }

    /// Rules with a target pointing at the function, each carrying those targets.
    ///
    /// A rule that also invokes something else is reported as shared: only
    /// the function's targets are removed and the rule itself stays.
    async fn discover_rules(
        &self,
        function_arn: &str,
    ) -> Result<Vec<DiscoveredResource>, ProviderError> {
        let mut rules = Vec::new();
        let names = or_empty(
            self.functions.list_rules_targeting(function_arn).await,
            "list rules by target",
            function_arn,
        )?;

        for name in names {
            let (ours, foreign): (Vec<_>, Vec<_>) = or_empty(
                self.functions.list_rule_targets(&name).await,
                "list rule targets",
                &name,
            )?
            .into_iter()
            .partition(|t| t.arn == function_arn);

            if ours.is_empty() {
                continue;
            }
            let kind = if foreign.is_empty() {
                ResourceKind::EventRule
            } else {
                ResourceKind::SharedEventRule
            };
            let targets = ours
                .into_iter()
                .map(|t| DiscoveredResource::new(ResourceKind::EventTarget, t.id, t.arn))
                .collect();
            rules.push(DiscoveredResource::new(kind, &name, &name).with_dependents(targets));
        }

        Ok(rules)
    }
}

impl<P: ServerlessOperations> FamilyHandler for ServerlessHandler<'_, P> {
    fn family(&self) -> ResourceFamily {
        ResourceFamily::Serverless
    }

    async fn discover(
        &self,
        scope: &ProjectScope,
    ) -> Result<Vec<DiscoveredResource>, ProviderError> {
        let mut found = Vec::new();
        let functions = or_empty(
            self.functions.list_functions().await,
            "list functions",
            &scope.region,
        )?;

        for function in functions {
            let tags = or_empty(
                self.functions.function_tags(&function.arn).await,
                "function tags",
                &function.name,
            )?;
            if !matches(FUNCTION_MATCH, &function.name, &tags, scope) {
                continue;
            }

            let mut dependents = self.discover_rules(&function.arn).await?;
            dependents.extend(
                or_empty(
                    self.functions.list_versions(&function.name).await,
                    "list versions",
                    &function.name,
                )?
                .into_iter()
                .filter(|v| v != LATEST_VERSION)
                .map(|v| DiscoveredResource::new(ResourceKind::FunctionVersion, &v, &v)),
            );

            found.push(
                DiscoveredResource::new(ResourceKind::Function, &function.name, &function.name)
                    .with_tags(tags)
                    .with_dependents(dependents),
            );
        }

        Ok(found)
    }

    /// Unbind and delete trigger rules, delete published versions, then the function.
    /// Shared rules only lose the function's targets.
    async fn teardown(
        &self,
        function: &DiscoveredResource,
        mode: RunMode,
    ) -> Result<TeardownOutcome, ProviderError> {
        let mut rec = Recorder::new(self.family(), mode);
        let lambda = self.functions;
        let function_name = function.id.as_str();

        if !rec.is_report_only() {
            info!(function = %function_name, "Tearing down Lambda function");
        }

        for rule in function.dependents_of(ResourceKind::EventRule) {
            let rule_name = rule.id.as_str();
            for target in rule.dependents_of(ResourceKind::EventTarget) {
                rec.prepare(rule_name, "remove target", || {
                    lambda.remove_rule_target(rule_name, &target.id)
                })
                .await?;
            }
            rec.remove(rule, || lambda.delete_rule(rule_name)).await?;
        }

        for rule in function.dependents_of(ResourceKind::SharedEventRule) {
            let rule_name = rule.id.as_str();
            for target in rule.dependents_of(ResourceKind::EventTarget) {
                rec.remove(target, || lambda.remove_rule_target(rule_name, &target.id))
                    .await?;
            }
            if !rec.is_report_only() {
                info!(rule = %rule_name, "Rule has other targets, leaving it in place");
            }
        }

        for version in function.dependents_of(ResourceKind::FunctionVersion) {
            rec.remove(version, || {
                lambda.delete_function_version(function_name, &version.id)
            })
            .await?;
        }

        rec.remove(function, || lambda.delete_function(function_name)).await?;

        Ok(rec.finish())
    }
}
