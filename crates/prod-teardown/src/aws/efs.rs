//! EFS filesystems, mount targets and access points

use super::{AwsCloud, ProviderError, SdkField, extract_tags};
use aws_sdk_efs::types::LifeCycleState;
use prod_teardown_common::Tags;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemSummary {
    pub id: String,
    pub name: String,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountTargetSummary {
    pub id: String,
    pub subnet_id: String,
    /// Already being removed; deleting it again would fail
    pub deleting: bool,
}

/// EFS operations used by the filesystem family.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
pub trait EfsOperations: Send + Sync {
    /// Filesystems that are not already being deleted
    async fn list_file_systems(&self) -> Result<Vec<FileSystemSummary>, ProviderError>;

    async fn list_mount_targets(
        &self,
        file_system_id: &str,
    ) -> Result<Vec<MountTargetSummary>, ProviderError>;

    async fn delete_mount_target(&self, mount_target_id: &str) -> Result<(), ProviderError>;

    /// Access point IDs on a filesystem
    async fn list_access_points(&self, file_system_id: &str) -> Result<Vec<String>, ProviderError>;

    async fn delete_access_point(&self, access_point_id: &str) -> Result<(), ProviderError>;

    async fn delete_file_system(&self, file_system_id: &str) -> Result<(), ProviderError>;
}

fn is_going_away(state: Option<&LifeCycleState>) -> bool {
    matches!(state, Some(LifeCycleState::Deleting | LifeCycleState::Deleted))
}

impl EfsOperations for AwsCloud {
    async fn list_file_systems(&self) -> Result<Vec<FileSystemSummary>, ProviderError> {
        let mut file_systems = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let resp = self
                .efs
                .describe_file_systems()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(ProviderError::from_sdk)?;

            for fs in resp.file_systems() {
                if is_going_away(fs.life_cycle_state().field()) {
                    continue;
                }
                let Some(id) = fs.file_system_id().field() else {
                    continue;
                };
                file_systems.push(FileSystemSummary {
                    id: id.to_string(),
                    name: fs.name().unwrap_or(id).to_string(),
                    tags: extract_tags(fs.tags(), |t| t.key().field(), |t| t.value().field()),
                });
            }

            match resp.next_marker() {
                Some(m) => marker = Some(m.to_string()),
                None => break,
            }
        }

        Ok(file_systems)
    }

    async fn list_mount_targets(
        &self,
        file_system_id: &str,
    ) -> Result<Vec<MountTargetSummary>, ProviderError> {
        let resp = self
            .efs
            .describe_mount_targets()
            .file_system_id(file_system_id)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;

        Ok(resp
            .mount_targets()
            .iter()
            .filter_map(|mt| {
                Some(MountTargetSummary {
                    id: mt.mount_target_id().field()?.to_string(),
                    subnet_id: mt.subnet_id().field().unwrap_or_default().to_string(),
                    deleting: is_going_away(mt.life_cycle_state().field()),
                })
            })
            .collect())
    }

    async fn delete_mount_target(&self, mount_target_id: &str) -> Result<(), ProviderError> {
        self.efs
            .delete_mount_target()
            .mount_target_id(mount_target_id)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn list_access_points(&self, file_system_id: &str) -> Result<Vec<String>, ProviderError> {
        let resp = self
            .efs
            .describe_access_points()
            .file_system_id(file_system_id)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;

        Ok(resp
            .access_points()
            .iter()
            .filter_map(|ap| ap.access_point_id())
            .map(str::to_string)
            .collect())
    }

    async fn delete_access_point(&self, access_point_id: &str) -> Result<(), ProviderError> {
        self.efs
            .delete_access_point()
            .access_point_id(access_point_id)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }

    async fn delete_file_system(&self, file_system_id: &str) -> Result<(), ProviderError> {
        self.efs
            .delete_file_system()
            .file_system_id(file_system_id)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(())
    }
}
