//! ECS clusters, services and task definitions

use super::{AwsCloud, ProviderError, SdkField, extract_tags};
use prod_teardown_common::Tags;
use tracing::debug;

/// Service status once ECS has finished draining a deleted service
pub const SERVICE_INACTIVE: &str = "INACTIVE";

/// ECS operations used by the compute family.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
pub trait EcsOperations: Send + Sync {
    /// ARNs of every cluster in the region
    async fn list_clusters(&self) -> Result<Vec<String>, ProviderError>;

    async fn cluster_tags(&self, cluster_arn: &str) -> Result<Tags, ProviderError>;

    /// Service ARNs in a cluster
    async fn list_services(&self, cluster_arn: &str) -> Result<Vec<String>, ProviderError>;

    async fn scale_service_to_zero(
        &self,
        cluster_arn: &str,
        service_arn: &str,
    ) -> Result<(), ProviderError>;

    /// Delete a service even if tasks are still running
    async fn delete_service(&self, cluster_arn: &str, service_arn: &str)
    -> Result<(), ProviderError>;

    /// Current service status, `None` once ECS no longer reports it
    async fn service_status(
        &self,
        cluster_arn: &str,
        service_arn: &str,
    ) -> Result<Option<String>, ProviderError>;

    async fn delete_cluster(&self, cluster_arn: &str) -> Result<(), ProviderError>;

    /// ARNs of every active task definition revision
    async fn list_task_definitions(&self) -> Result<Vec<String>, ProviderError>;

    async fn deregister_task_definition(&self, arn: &str) -> Result<(), ProviderError>;
}

/// Family name of a task definition ARN
/// (`arn:aws:ecs:<region>:<account>:task-definition/<family>:<revision>`).
pub fn task_definition_family(arn: &str) -> &str {
    let tail = arn.rsplit('/').next().unwrap_or(arn);
    tail.split(':').next().unwrap_or(tail)
}

/// Last path segment of an ARN, used as display name
pub fn arn_name(arn: &str) -> &str {
    arn.rsplit('/').next().unwrap_or(arn)
}

impl EcsOperations for AwsCloud {
    async fn list_clusters(&self) -> Result<Vec<String>, ProviderError> {
        let mut arns = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let resp = self
                .ecs
                .list_clusters()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(ProviderError::from_sdk)?;

            arns.extend(resp.cluster_arns().iter().cloned());

            match resp.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(count = arns.len(), "Listed ECS clusters");
        Ok(arns)
    }

    async fn cluster_tags(&self, cluster_arn: &str) -> Result<Tags, ProviderError> {
        let resp = self
            .ecs
            .list_tags_for_resource()
            .resource_arn(cluster_arn)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;

        Ok(extract_tags(
            resp.tags(),
            |t| t.key().field(),
            |t| t.value().field(),
        ))
    }

    async fn list_services(&self, cluster_arn: &str) -> Result<Vec<String>, ProviderError> {
        let mut arns = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let resp = self
                .ecs
                .list_services()
                .cluster(cluster_arn)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(ProviderError::from_sdk)?;

            arns.extend(resp.service_arns().iter().cloned());

            match resp.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(arns)
    }

    async fn scale_service_to_zero(
        &self,
        cluster_arn: &str,
        service_arn: &str,
    ) -> Result<(), ProviderError> {
        self.ecs
            .update_service()
            .cluster(cluster_arn)
            .service(service_arn)
            .desired_count(0)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn delete_service(
        &self,
        cluster_arn: &str,
        service_arn: &str,
    ) -> Result<(), ProviderError> {
        self.ecs
            .delete_service()
            .cluster(cluster_arn)
            .service(service_arn)
            .force(true)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn service_status(
        &self,
        cluster_arn: &str,
        service_arn: &str,
    ) -> Result<Option<String>, ProviderError> {
        let resp = self
            .ecs
            .describe_services()
            .cluster(cluster_arn)
            .services(service_arn)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;

        // A service ECS has forgotten shows up under `failures`, not `services`
        Ok(resp
            .services()
            .first()
            .and_then(|s| s.status())
            .map(str::to_string))
    }

    async fn delete_cluster(&self, cluster_arn: &str) -> Result<(), ProviderError> {
        self.ecs
            .delete_cluster()
            .cluster(cluster_arn)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn list_task_definitions(&self) -> Result<Vec<String>, ProviderError> {
        let mut arns = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let resp = self
                .ecs
                .list_task_definitions()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(ProviderError::from_sdk)?;

            arns.extend(resp.task_definition_arns().iter().cloned());

            match resp.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(arns)
    }

    async fn deregister_task_definition(&self, arn: &str) -> Result<(), ProviderError> {
        self.ecs
            .deregister_task_definition()
            .task_definition(arn)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }
}
