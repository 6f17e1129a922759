//! ECS clusters, their services, and the project's task definitions

use super::{FamilyHandler, Recorder, or_empty};
use crate::aws::ecs::{SERVICE_INACTIVE, arn_name, task_definition_family};
use crate::aws::{EcsOperations, ProviderError};
use crate::wait::{WaitConfig, wait_until_terminal};
use prod_teardown_common::tags::matches;
use prod_teardown_common::{
    DiscoveredResource, MatchStrategy, ProjectScope, ResourceFamily, ResourceKind, RunMode,
    TeardownOutcome,
};
use tracing::info;

const CLUSTER_MATCH: MatchStrategy = MatchStrategy::Tag;
const TASK_DEFINITION_MATCH: MatchStrategy = MatchStrategy::Name;

pub struct ComputeHandler<'a, P> {
    ecs: &'a P,
    wait: &'a WaitConfig,
}

impl<'a, P: EcsOperations> ComputeHandler<'a, P> {
    pub fn new(ecs: &'a P, wait: &'a WaitConfig) -> Self {
        Self { ecs, wait }
    }

    async fn discover_clusters(
        &self,
        scope: &ProjectScope,
    ) -> Result<Vec<DiscoveredResource>, ProviderError> {
        let mut clusters = Vec::new();

        for arn in or_empty(self.ecs.list_clusters().await, "list clusters", &scope.region)? {
            let tags = or_empty(self.ecs.cluster_tags(&arn).await, "cluster tags", &arn)?;
            let name = arn_name(&arn);
            if !matches(CLUSTER_MATCH, name, &tags, scope) {
                continue;
            }

            let services = or_empty(self.ecs.list_services(&arn).await, "list services", &arn)?
                .into_iter()
                .map(|service| {
                    let name = arn_name(&service).to_string();
                    DiscoveredResource::new(ResourceKind::EcsService, service, name)
                })
                .collect();

            clusters.push(
                DiscoveredResource::new(ResourceKind::EcsCluster, &arn, name)
                    .with_tags(tags)
                    .with_dependents(services),
            );
        }

        Ok(clusters)
    }

    async fn discover_task_definitions(
        &self,
        scope: &ProjectScope,
    ) -> Result<Vec<DiscoveredResource>, ProviderError> {
        let arns = or_empty(
            self.ecs.list_task_definitions().await,
            "list task definitions",
            &scope.region,
        )?;

        Ok(arns
            .into_iter()
            .filter(|arn| {
                matches(
                    TASK_DEFINITION_MATCH,
                    task_definition_family(arn),
                    &Default::default(),
                    scope,
                )
            })
            .map(|arn| {
                let name = arn_name(&arn).to_string();
                DiscoveredResource::new(ResourceKind::TaskDefinition, arn, name)
            })
            .collect())
    }

    /// Scale and delete every service, wait for them to drain, then the cluster.
    async fn teardown_cluster(
        &self,
        cluster: &DiscoveredResource,
        rec: &mut Recorder,
    ) -> Result<(), ProviderError> {
        let ecs = self.ecs;
        let cluster_arn = cluster.id.as_str();

        if !rec.is_report_only() {
            info!(
                cluster = %cluster.name,
                services = cluster.dependents.len(),
                "Tearing down ECS cluster"
            );
        }

        let mut deleted_services = Vec::new();
        for service in cluster.dependents_of(ResourceKind::EcsService) {
            let service_arn = service.id.as_str();
            rec.prepare(service_arn, "scale to zero", || {
                ecs.scale_service_to_zero(cluster_arn, service_arn)
            })
            .await?;
            if rec
                .remove(service, || ecs.delete_service(cluster_arn, service_arn))
                .await?
            {
                deleted_services.push(service_arn);
            }
        }

        for service_arn in deleted_services {
            wait_until_terminal(
                service_arn,
                || async move {
                    let status = ecs.service_status(cluster_arn, service_arn).await?;
                    Ok(status.is_none_or(|s| s == SERVICE_INACTIVE))
                },
                self.wait,
            )
            .await?;
        }

        rec.remove(cluster, || ecs.delete_cluster(cluster_arn)).await?;
        Ok(())
    }
}

impl<P: EcsOperations> FamilyHandler for ComputeHandler<'_, P> {
    fn family(&self) -> ResourceFamily {
        ResourceFamily::Compute
    }

    async fn discover(
        &self,
        scope: &ProjectScope,
    ) -> Result<Vec<DiscoveredResource>, ProviderError> {
        let mut resources = self.discover_clusters(scope).await?;
        resources.extend(self.discover_task_definitions(scope).await?);
        Ok(resources)
    }

    async fn teardown(
        &self,
        resource: &DiscoveredResource,
        mode: RunMode,
    ) -> Result<TeardownOutcome, ProviderError> {
        let mut rec = Recorder::new(self.family(), mode);

        match resource.kind {
            ResourceKind::EcsCluster => self.teardown_cluster(resource, &mut rec).await?,
            ResourceKind::TaskDefinition => {
                let ecs = self.ecs;
                rec.remove(resource, || ecs.deregister_task_definition(&resource.id))
                    .await?;
            }
            _ => {}
        }

        Ok(rec.finish())
    }
}
