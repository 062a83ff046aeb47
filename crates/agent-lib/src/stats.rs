//! Node and pod resource statistics
//!
//! Serde model of the summary snapshot consumed by the eviction manager,
//! plus the provider trait and an HTTP implementation that fetches a
//! kubelet-style `/stats/summary` endpoint. The collector producing these
//! snapshots lives outside this agent; tests back the trait with fixtures.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

/// Point-in-time snapshot of node and per-pod resource usage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    #[serde(default)]
    pub node: NodeStats,
    #[serde(default)]
    pub pods: Vec<PodStats>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStats {
    #[serde(default)]
    pub node_name: String,
    pub memory: Option<MemoryStats>,
    pub fs: Option<FsStats>,
    pub runtime: Option<RuntimeStats>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub available_bytes: Option<u64>,
    pub usage_bytes: Option<u64>,
    pub working_set_bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsStats {
    pub available_bytes: Option<u64>,
    pub capacity_bytes: Option<u64>,
    pub used_bytes: Option<u64>,
    pub inodes_free: Option<u64>,
    pub inodes: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeStats {
    pub image_fs: Option<FsStats>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStats {
    #[serde(default)]
    pub pod_ref: PodReference,
    #[serde(default)]
    pub containers: Vec<ContainerStats>,
    pub memory: Option<MemoryStats>,
    #[serde(default)]
    pub volume_stats: Vec<VolumeStats>,
    pub network: Option<NetworkStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodReference {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub uid: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStats {
    pub name: String,
    pub memory: Option<MemoryStats>,
    pub rootfs: Option<FsStats>,
    pub logs: Option<FsStats>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStats {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub fs: FsStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    pub rx_bytes: Option<u64>,
    pub tx_bytes: Option<u64>,
}

/// Source of summary snapshots.
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    async fn get(&self) -> Result<Summary>;
}

/// Fetches summaries from a stats endpoint over HTTP.
pub struct HttpSummaryProvider {
    client: Client,
    endpoint: Url,
}

impl HttpSummaryProvider {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;
        let endpoint = Url::parse(endpoint).context("Invalid summary endpoint")?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl SummaryProvider for HttpSummaryProvider {
    async fn get(&self) -> Result<Summary> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .context("Failed to fetch stats summary")?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("stats endpoint returned {}", status);
        }

        response
            .json()
            .await
            .context("Failed to parse stats summary")
    }
}
