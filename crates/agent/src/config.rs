//! Agent configuration

use agent_lib::eviction::{self, parse_threshold_config};
use anyhow::{bail, Result};
use serde::Deserialize;
use std::time::Duration;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Node name from the Kubernetes downward API
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// API server port for health/metrics/admission
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Stats summary endpoint to observe
    #[serde(default = "default_summary_endpoint")]
    pub summary_endpoint: String,

    /// Interval between eviction synchronize cycles in seconds
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    /// Whether container images live on their own filesystem
    #[serde(default)]
    pub dedicated_image_fs: bool,

    /// Hard eviction thresholds, e.g. "memory.available<100Mi"
    #[serde(default = "default_eviction_hard")]
    pub eviction_hard: String,

    /// Soft eviction thresholds, e.g. "memory.available<300Mi"
    #[serde(default)]
    pub eviction_soft: String,

    /// Grace periods for soft thresholds, e.g. "memory.available=2m"
    #[serde(default)]
    pub eviction_soft_grace_period: String,

    /// Grace period granted to victims of soft-threshold evictions
    #[serde(default = "default_max_pod_grace")]
    pub eviction_max_pod_grace_period_seconds: i64,

    /// Seconds a pressure condition stays raised after signals clear
    #[serde(default = "default_pressure_transition")]
    pub eviction_pressure_transition_period_secs: u64,
}

fn default_node_name() -> String {
    std::env::var("NODE_NAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_summary_endpoint() -> String {
    "http://127.0.0.1:10255/stats/summary".to_string()
}

fn default_sync_interval() -> u64 {
    10
}

fn default_eviction_hard() -> String {
    "memory.available<100Mi".to_string()
}

fn default_max_pod_grace() -> i64 {
    30
}

fn default_pressure_transition() -> u64 {
    300
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            api_port: default_api_port(),
            summary_endpoint: default_summary_endpoint(),
            sync_interval_secs: default_sync_interval(),
            dedicated_image_fs: false,
            eviction_hard: default_eviction_hard(),
            eviction_soft: String::new(),
            eviction_soft_grace_period: String::new(),
            eviction_max_pod_grace_period_seconds: default_max_pod_grace(),
            eviction_pressure_transition_period_secs: default_pressure_transition(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("AGENT"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }

    /// Translate the operator-facing flags into the eviction configuration.
    /// Invalid flags fail startup.
    pub fn eviction_config(&self) -> Result<eviction::Config> {
        if self.eviction_max_pod_grace_period_seconds < 0 {
            bail!("AGENT_EVICTION_MAX_POD_GRACE_PERIOD_SECONDS must not be negative");
        }
        if self.sync_interval_secs == 0 {
            bail!("AGENT_SYNC_INTERVAL_SECS must be positive");
        }

        let thresholds = parse_threshold_config(
            &self.eviction_hard,
            &self.eviction_soft,
            &self.eviction_soft_grace_period,
        )?;

        Ok(eviction::Config {
            max_pod_grace_period_seconds: self.eviction_max_pod_grace_period_seconds,
            pressure_transition_period: Duration::from_secs(
                self.eviction_pressure_transition_period_secs,
            ),
            thresholds,
        })
    }
}
