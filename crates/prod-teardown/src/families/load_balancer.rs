//! Application load balancers
//!
//! A load balancer is discovered with its listeners (each carrying its
//! non-default rules) followed by the target groups it forwards to. The
//! target groups stay in use until the load balancer is fully gone, so they
//! are removed only after the wait.

use super::{FamilyHandler, Recorder, or_empty};
use crate::aws::{ElbOperations, ProviderError};
use crate::wait::{WaitConfig, wait_until_terminal};
use prod_teardown_common::tags::matches;
use prod_teardown_common::{
    DiscoveredResource, MatchStrategy, ProjectScope, ResourceFamily, ResourceKind, RunMode,
    TeardownOutcome,
};
use tracing::info;

const LOAD_BALANCER_MATCH: MatchStrategy = MatchStrategy::Tag;

pub struct LoadBalancerHandler<'a, P> {
    elb: &'a P,
    wait: &'a WaitConfig,
}

impl<'a, P: ElbOperations> LoadBalancerHandler<'a, P> {
    pub fn new(elb: &'a P, wait: &'a WaitConfig) -> Self {
        Self { elb, wait }
    }

    async fn discover_listeners(
        &self,
        load_balancer_arn: &str,
    ) -> Result<Vec<DiscoveredResource>, ProviderError> {
        let mut listeners = Vec::new();
        let arns = or_empty(
            self.elb.list_listeners(load_balancer_arn).await,
            "list listeners",
            load_balancer_arn,
        )?;

        for arn in arns {
            let rules = or_empty(self.elb.list_rules(&arn).await, "list rules", &arn)?
                .into_iter()
                .filter(|rule| !rule.is_default)
                .map(|rule| {
                    DiscoveredResource::new(ResourceKind::ListenerRule, rule.arn.clone(), rule.arn)
                })
                .collect();
            listeners.push(
                DiscoveredResource::new(ResourceKind::Listener, &arn, &arn).with_dependents(rules),
            );
        }

        Ok(listeners)
    }
}

impl<P: ElbOperations> FamilyHandler for LoadBalancerHandler<'_, P> {
    fn family(&self) -> ResourceFamily {
        ResourceFamily::LoadBalancer
    }

    async fn discover(
        &self,
        scope: &ProjectScope,
    ) -> Result<Vec<DiscoveredResource>, ProviderError> {
        let mut found = Vec::new();
        let load_balancers = or_empty(
            self.elb.list_load_balancers().await,
            "list load balancers",
            &scope.region,
        )?;

        for lb in load_balancers {
            let tags = or_empty(self.elb.load_balancer_tags(&lb.arn).await, "tags", &lb.arn)?;
            if !matches(LOAD_BALANCER_MATCH, &lb.name, &tags, scope) {
                continue;
            }

            let mut dependents = self.discover_listeners(&lb.arn).await?;
            dependents.extend(
                or_empty(
                    self.elb.list_target_groups(&lb.arn).await,
                    "list target groups",
                    &lb.arn,
                )?
                .into_iter()
                .map(|tg| DiscoveredResource::new(ResourceKind::TargetGroup, tg.arn, tg.name)),
            );

            found.push(
                DiscoveredResource::new(ResourceKind::LoadBalancer, lb.arn, lb.name)
                    .with_tags(tags)
                    .with_dependents(dependents),
            );
        }

        Ok(found)
    }

    /// Rules, then listeners, then the load balancer; wait for it to go,
    /// then its target groups.
    async fn teardown(
        &self,
        lb: &DiscoveredResource,
        mode: RunMode,
    ) -> Result<TeardownOutcome, ProviderError> {
        let mut rec = Recorder::new(self.family(), mode);
        let elb = self.elb;
        let lb_arn = lb.id.as_str();

        if !rec.is_report_only() {
            info!(load_balancer = %lb.name, "Tearing down load balancer");
        }

        let listeners: Vec<_> = lb.dependents_of(ResourceKind::Listener).collect();
        for rule in listeners
            .iter()
            .flat_map(|l| l.dependents_of(ResourceKind::ListenerRule))
        {
            rec.remove(rule, || elb.delete_rule(&rule.id)).await?;
        }
        for listener in &listeners {
            rec.remove(listener, || elb.delete_listener(&listener.id)).await?;
        }

        if rec.remove(lb, || elb.delete_load_balancer(lb_arn)).await? {
            wait_until_terminal(
                lb_arn,
                || async move { Ok(!elb.load_balancer_exists(lb_arn).await?) },
                self.wait,
            )
            .await?;
        }

        for tg in lb.dependents_of(ResourceKind::TargetGroup) {
            rec.remove(tg, || elb.delete_target_group(&tg.id)).await?;
        }

        Ok(rec.finish())
    }
}
