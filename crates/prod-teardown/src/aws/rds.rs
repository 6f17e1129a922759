//! RDS instances and DB subnet groups

use super::{AwsCloud, ProviderError, SdkField, extract_tags};
use prod_teardown_common::Tags;

/// Instance status while RDS is already tearing it down
pub const DB_STATUS_DELETING: &str = "deleting";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbInstanceSummary {
    pub identifier: String,
    pub status: String,
    pub tags: Tags,
}

/// RDS operations used by the database family.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
pub trait RdsOperations: Send + Sync {
    /// Every DB instance in the region, with its tags
    async fn list_db_instances(&self) -> Result<Vec<DbInstanceSummary>, ProviderError>;

    /// Delete without a final snapshot, discarding automated backups
    async fn delete_db_instance(&self, identifier: &str) -> Result<(), ProviderError>;

    /// Names of every DB subnet group in the region
    async fn list_db_subnet_groups(&self) -> Result<Vec<String>, ProviderError>;

    async fn delete_db_subnet_group(&self, name: &str) -> Result<(), ProviderError>;
}

impl RdsOperations for AwsCloud {
    async fn list_db_instances(&self) -> Result<Vec<DbInstanceSummary>, ProviderError> {
        let mut instances = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let resp = self
                .rds
                .describe_db_instances()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(ProviderError::from_sdk)?;

            for db in resp.db_instances() {
                let Some(identifier) = db.db_instance_identifier() else {
                    continue;
                };
                instances.push(DbInstanceSummary {
                    identifier: identifier.to_string(),
                    status: db.db_instance_status().unwrap_or_default().to_string(),
                    tags: extract_tags(db.tag_list(), |t| t.key().field(), |t| t.value().field()),
                });
            }

            match resp.marker() {
                Some(m) => marker = Some(m.to_string()),
                None => break,
            }
        }

        Ok(instances)
    }

    async fn delete_db_instance(&self, identifier: &str) -> Result<(), ProviderError> {
        self.rds
            .delete_db_instance()
            .db_instance_identifier(identifier)
            .skip_final_snapshot(true)
            .delete_automated_backups(true)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn list_db_subnet_groups(&self) -> Result<Vec<String>, ProviderError> {
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let resp = self
                .rds
                .describe_db_subnet_groups()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(ProviderError::from_sdk)?;

            names.extend(
                resp.db_subnet_groups()
                    .iter()
                    .filter_map(|g| g.db_subnet_group_name())
                    .map(str::to_string),
            );

            match resp.marker() {
                Some(m) => marker = Some(m.to_string()),
                None => break,
            }
        }

        Ok(names)
    }

    async fn delete_db_subnet_group(&self, name: &str) -> Result<(), ProviderError> {
        self.rds
            .delete_db_subnet_group()
            .db_subnet_group_name(name)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }
}
