//! EFS filesystems

use super::{FamilyHandler, Recorder, or_empty};
use crate::aws::{EfsOperations, ProviderError};
use crate::wait::{WaitConfig, wait_until_terminal};
use prod_teardown_common::tags::matches;
use prod_teardown_common::{
    DiscoveredResource, MatchStrategy, ProjectScope, ResourceFamily, ResourceKind, RunMode,
    TeardownOutcome,
};
use tracing::info;

const FILE_SYSTEM_MATCH: MatchStrategy = MatchStrategy::Tag;

pub struct FileSystemHandler<'a, P> {
    efs: &'a P,
    wait: &'a WaitConfig,
}

impl<'a, P: EfsOperations> FileSystemHandler<'a, P> {
    pub fn new(efs: &'a P, wait: &'a WaitConfig) -> Self {
        Self { efs, wait }
    }
}

impl<P: EfsOperations> FamilyHandler for FileSystemHandler<'_, P> {
    fn family(&self) -> ResourceFamily {
        ResourceFamily::FileSystem
    }

    async fn discover(
        &self,
        scope: &ProjectScope,
    ) -> Result<Vec<DiscoveredResource>, ProviderError> {
        let mut found = Vec::new();
        let file_systems = or_empty(
            self.efs.list_file_systems().await,
            "list filesystems",
            &scope.region,
        )?;

        for fs in file_systems {
            if !matches(FILE_SYSTEM_MATCH, &fs.name, &fs.tags, scope) {
                continue;
            }

            let mut dependents: Vec<_> = or_empty(
                self.efs.list_mount_targets(&fs.id).await,
                "list mount targets",
                &fs.id,
            )?
            .into_iter()
            .filter(|mt| !mt.deleting)
            .map(|mt| DiscoveredResource::new(ResourceKind::MountTarget, mt.id, mt.subnet_id))
            .collect();

            dependents.extend(
                or_empty(
                    self.efs.list_access_points(&fs.id).await,
                    "list access points",
                    &fs.id,
                )?
                .into_iter()
                .map(|ap| DiscoveredResource::new(ResourceKind::AccessPoint, &ap, &ap)),
            );

            found.push(
                DiscoveredResource::new(ResourceKind::FileSystem, fs.id, fs.name)
                    .with_tags(fs.tags)
                    .with_dependents(dependents),
            );
        }

        Ok(found)
    }

    /// Mount targets, wait until none are left, access points, then the filesystem.
    async fn teardown(
        &self,
        fs: &DiscoveredResource,
        mode: RunMode,
    ) -> Result<TeardownOutcome, ProviderError> {
        let mut rec = Recorder::new(self.family(), mode);
        let efs = self.efs;
        let fs_id = fs.id.as_str();

        if !rec.is_report_only() {
            info!(file_system = %fs.name, id = %fs_id, "Tearing down EFS filesystem");
        }

        for mt in fs.dependents_of(ResourceKind::MountTarget) {
            rec.remove(mt, || efs.delete_mount_target(&mt.id)).await?;
        }

        // Targets already deleting at discovery time are not in the tree, so
        // poll the live list rather than the ones deleted here
        if !rec.is_report_only() {
            wait_until_terminal(
                fs_id,
                || async move { Ok(efs.list_mount_targets(fs_id).await?.is_empty()) },
                self.wait,
            )
            .await?;
        }

        for ap in fs.dependents_of(ResourceKind::AccessPoint) {
            rec.remove(ap, || efs.delete_access_point(&ap.id)).await?;
        }

        rec.remove(fs, || efs.delete_file_system(fs_id)).await?;

        Ok(rec.finish())
    }
}
