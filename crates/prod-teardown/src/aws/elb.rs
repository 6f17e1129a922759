//! Application load balancers, listeners, rules and target groups

use super::{AwsCloud, ProviderError, SdkField, extract_tags, ignore_not_found};
use prod_teardown_common::Tags;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancerSummary {
    pub arn: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerRuleSummary {
    pub arn: String,
    /// The default rule goes away with its listener and cannot be deleted
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetGroupSummary {
    pub arn: String,
    pub name: String,
}

/// ELBv2 operations used by the load balancer family.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
pub trait ElbOperations: Send + Sync {
    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancerSummary>, ProviderError>;

    async fn load_balancer_tags(&self, arn: &str) -> Result<Tags, ProviderError>;

    /// Listener ARNs on a load balancer
    async fn list_listeners(&self, load_balancer_arn: &str) -> Result<Vec<String>, ProviderError>;

    async fn list_rules(&self, listener_arn: &str)
    -> Result<Vec<ListenerRuleSummary>, ProviderError>;

    async fn delete_rule(&self, rule_arn: &str) -> Result<(), ProviderError>;

    async fn delete_listener(&self, listener_arn: &str) -> Result<(), ProviderError>;

    /// Target groups forwarding from a load balancer
    async fn list_target_groups(
        &self,
        load_balancer_arn: &str,
    ) -> Result<Vec<TargetGroupSummary>, ProviderError>;

    async fn delete_load_balancer(&self, arn: &str) -> Result<(), ProviderError>;

    /// False once the load balancer is no longer reported
    async fn load_balancer_exists(&self, arn: &str) -> Result<bool, ProviderError>;

    async fn delete_target_group(&self, arn: &str) -> Result<(), ProviderError>;
}

impl ElbOperations for AwsCloud {
    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancerSummary>, ProviderError> {
        let mut load_balancers = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let resp = self
                .elb
                .describe_load_balancers()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(ProviderError::from_sdk)?;

            for lb in resp.load_balancers() {
                let Some(arn) = lb.load_balancer_arn() else {
                    continue;
                };
                load_balancers.push(LoadBalancerSummary {
                    arn: arn.to_string(),
                    name: lb.load_balancer_name().unwrap_or(arn).to_string(),
                });
            }

            match resp.next_marker() {
                Some(m) => marker = Some(m.to_string()),
                None => break,
            }
        }

        Ok(load_balancers)
    }

    async fn load_balancer_tags(&self, arn: &str) -> Result<Tags, ProviderError> {
        let resp = self
            .elb
            .describe_tags()
            .resource_arns(arn)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;

        Ok(resp
            .tag_descriptions()
            .first()
            .map(|d| extract_tags(d.tags(), |t| t.key().field(), |t| t.value().field()))
            .unwrap_or_default())
    }

    async fn list_listeners(&self, load_balancer_arn: &str) -> Result<Vec<String>, ProviderError> {
        let mut arns = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let resp = self
                .elb
                .describe_listeners()
                .load_balancer_arn(load_balancer_arn)
                .set_marker(marker.take())
                .send()
                .await
                .map_err(ProviderError::from_sdk)?;

            arns.extend(
                resp.listeners()
                    .iter()
                    .filter_map(|l| l.listener_arn())
                    .map(str::to_string),
            );

            match resp.next_marker() {
                Some(m) => marker = Some(m.to_string()),
                None => break,
            }
        }

        Ok(arns)
    }

    async fn list_rules(
        &self,
        listener_arn: &str,
    ) -> Result<Vec<ListenerRuleSummary>, ProviderError> {
        let mut rules = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let resp = self
                .elb
                .describe_rules()
                .listener_arn(listener_arn)
                .set_marker(marker.take())
                .send()
                .await
                .map_err(ProviderError::from_sdk)?;

            rules.extend(resp.rules().iter().filter_map(|r| {
                Some(ListenerRuleSummary {
                    arn: r.rule_arn()?.to_string(),
                    is_default: r.is_default().unwrap_or(false),
                })
            }));

            match resp.next_marker() {
                Some(m) => marker = Some(m.to_string()),
                None => break,
            }
        }

        Ok(rules)
    }

    async fn delete_rule(&self, rule_arn: &str) -> Result<(), ProviderError> {
        self.elb
            .delete_rule()
            .rule_arn(rule_arn)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn delete_listener(&self, listener_arn: &str) -> Result<(), ProviderError> {
        self.elb
            .delete_listener()
            .listener_arn(listener_arn)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn list_target_groups(
        &self,
        load_balancer_arn: &str,
    ) -> Result<Vec<TargetGroupSummary>, ProviderError> {
        let resp = self
            .elb
            .describe_target_groups()
            .load_balancer_arn(load_balancer_arn)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;

        Ok(resp
            .target_groups()
            .iter()
            .filter_map(|tg| {
                let arn = tg.target_group_arn()?;
                Some(TargetGroupSummary {
                    arn: arn.to_string(),
                    name: tg.target_group_name().unwrap_or(arn).to_string(),
                })
            })
            .collect())
    }

    async fn delete_load_balancer(&self, arn: &str) -> Result<(), ProviderError> {
        self.elb
            .delete_load_balancer()
            .load_balancer_arn(arn)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn load_balancer_exists(&self, arn: &str) -> Result<bool, ProviderError> {
        let resp = ignore_not_found(
            self.elb
                .describe_load_balancers()
                .load_balancer_arns(arn)
                .send()
                .await
                .map_err(ProviderError::from_sdk),
        )?;
        Ok(resp.is_some_and(|r| !r.load_balancers().is_empty()))
    }

    async fn delete_target_group(&self, arn: &str) -> Result<(), ProviderError> {
        self.elb
            .delete_target_group()
            .target_group_arn(arn)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }
}
