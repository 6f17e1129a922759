//! RDS instances and DB subnet groups
//!
//! Instances are deleted without a final snapshot. Subnet groups are matched
//! by name and deleted right after the instance deletes are issued, without
//! waiting. While an instance is still shutting down the subnet group delete
//! fails, and that failure is recorded like any other.

use super::{FamilyHandler, Recorder, or_empty};
use crate::aws::rds::DB_STATUS_DELETING;
use crate::aws::{ProviderError, RdsOperations};
use prod_teardown_common::tags::matches;
use prod_teardown_common::{
    DiscoveredResource, MatchStrategy, ProjectScope, ResourceFamily, ResourceKind, RunMode,
    TeardownOutcome,
};
use tracing::debug;

const INSTANCE_MATCH: MatchStrategy = MatchStrategy::Tag;
const SUBNET_GROUP_MATCH: MatchStrategy = MatchStrategy::Name;

pub struct DatabaseHandler<'a, P> {
    rds: &'a P,
}

impl<'a, P: RdsOperations> DatabaseHandler<'a, P> {
    pub fn new(rds: &'a P) -> Self {
        Self { rds }
    }
}

impl<P: RdsOperations> FamilyHandler for DatabaseHandler<'_, P> {
    fn family(&self) -> ResourceFamily {
        ResourceFamily::Database
    }

    /// Instances first, then subnet groups, so teardown follows discovery order.
    async fn discover(
        &self,
        scope: &ProjectScope,
    ) -> Result<Vec<DiscoveredResource>, ProviderError> {
        let mut found = Vec::new();

        let instances = or_empty(
            self.rds.list_db_instances().await,
            "list DB instances",
            &scope.region,
        )?;
        for db in instances {
            if !matches(INSTANCE_MATCH, &db.identifier, &db.tags, scope) {
                continue;
            }
            if db.status == DB_STATUS_DELETING {
                debug!(db_instance = %db.identifier, "Already deleting, skipping");
                continue;
            }
            found.push(
                DiscoveredResource::new(ResourceKind::DbInstance, &db.identifier, &db.identifier)
                    .with_tags(db.tags),
            );
        }

        let groups = or_empty(
            self.rds.list_db_subnet_groups().await,
            "list DB subnet groups",
            &scope.region,
        )?;
        found.extend(
            groups
                .into_iter()
                .filter(|name| matches(SUBNET_GROUP_MATCH, name, &Default::default(), scope))
                .map(|name| DiscoveredResource::new(ResourceKind::DbSubnetGroup, &name, &name)),
        );

        Ok(found)
    }

    async fn teardown(
        &self,
        resource: &DiscoveredResource,
        mode: RunMode,
    ) -> Result<TeardownOutcome, ProviderError> {
        let mut rec = Recorder::new(self.family(), mode);
        let rds = self.rds;
        let id = resource.id.as_str();

        match resource.kind {
            ResourceKind::DbInstance => {
                rec.remove(resource, || rds.delete_db_instance(id)).await?;
            }
            ResourceKind::DbSubnetGroup => {
                rec.remove(resource, || rds.delete_db_subnet_group(id)).await?;
            }
            _ => {}
        }

        Ok(rec.finish())
    }
}
