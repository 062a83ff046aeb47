//! Collaborator implementations wired by the binary

use agent_lib::eviction::{DiskInfoProvider, PodKiller};
use agent_lib::models::{Pod, PodStatus};
use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

/// Disk layout from configuration; the agent has no runtime probe of its
/// own.
pub struct StaticDiskInfoProvider {
    pub dedicated_image_fs: bool,
}

impl DiskInfoProvider for StaticDiskInfoProvider {
    fn has_dedicated_image_fs(&self) -> Result<bool> {
        Ok(self.dedicated_image_fs)
    }
}

/// Logs eviction decisions instead of signalling processes.
///
/// The standalone agent runs observe-only; a hosting integration that owns
/// the pod lifecycle injects a real killer through the manager builder.
pub struct LogPodKiller;

#[async_trait]
impl PodKiller for LogPodKiller {
    async fn kill_pod(
        &self,
        pod: &Pod,
        status: PodStatus,
        grace_period_override: Option<i64>,
    ) -> Result<()> {
        warn!(
            pod = %pod.key(),
            reason = %status.reason,
            message = %status.message,
            grace_period_override = ?grace_period_override,
            "Eviction decision (observe-only mode, no process signalled)"
        );
        Ok(())
    }
}
