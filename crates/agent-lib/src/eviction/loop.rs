//! Eviction control loop
//!
//! Drives the manager's synchronize cycle on a fixed interval, honors a
//! shutdown signal between cycles, and feeds cycle outcomes to the health
//! tracker and metrics.

use super::manager::{ActivePodsFunc, DiskInfoProvider, Manager};
use crate::health::{HealthStatus, HealthTracker};
use crate::observability::AgentMetrics;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Instant};
use tracing::{debug, info, warn};

/// Configuration for the eviction control loop
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Interval between synchronize cycles (default: 10 seconds)
    pub interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
        }
    }
}

/// Ticker-driven wrapper around `Manager::synchronize`
pub struct EvictionLoop {
    manager: Arc<Manager>,
    disk_info: Arc<dyn DiskInfoProvider>,
    active_pods: ActivePodsFunc,
    health: HealthTracker,
    metrics: AgentMetrics,
    config: LoopConfig,
}

impl EvictionLoop {
    /// Run until the shutdown signal fires. The signal is only honored
    /// between cycles; an in-flight synchronize always completes.
    pub async fn run(self, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting eviction control loop"
        );

        let mut ticker = interval(self.config.interval);
        let mut cycle_count = 0u64;
        let mut last_fetch_errors = self.metrics.summary_fetch_errors();
        let mut last_status = HealthStatus::Healthy;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let start = Instant::now();
                    let pods_tracked = (self.active_pods)().len();
                    self.metrics.set_pods_tracked(pods_tracked as i64);

                    self.manager
                        .synchronize(self.disk_info.as_ref(), &self.active_pods)
                        .await;

                    let elapsed = start.elapsed();
                    self.metrics.observe_synchronize_latency(elapsed.as_secs_f64());
                    cycle_count += 1;

                    // Log cycle stats periodically
                    if cycle_count % 6 == 0 {
                        debug!(
                            cycles = cycle_count,
                            pods = pods_tracked,
                            elapsed_ms = elapsed.as_millis(),
                            memory_pressure = self.manager.is_under_memory_pressure(),
                            disk_pressure = self.manager.is_under_disk_pressure(),
                            "Eviction cycle complete"
                        );
                    }

                    // A bumped fetch-error counter means this cycle was
                    // skipped on stale input
                    let fetch_errors = self.metrics.summary_fetch_errors();
                    if fetch_errors > last_fetch_errors {
                        self.health
                            .record_cycle_failure("summary fetch failed")
                            .await;
                    } else {
                        self.health.record_cycle_success().await;
                    }
                    last_fetch_errors = fetch_errors;

                    let status = self.health.health().await.status;
                    if status != last_status {
                        match status {
                            HealthStatus::Healthy => info!("Summary source recovered"),
                            _ => warn!(
                                status = ?status,
                                "Eviction cycles are failing, pressure state going stale"
                            ),
                        }
                        last_status = status;
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down eviction control loop");
                    break;
                }
            }
        }
    }
}

/// Builder for creating and starting the eviction loop
pub struct EvictionLoopBuilder {
    manager: Option<Arc<Manager>>,
    disk_info: Option<Arc<dyn DiskInfoProvider>>,
    active_pods: Option<ActivePodsFunc>,
    health: Option<HealthTracker>,
    metrics: Option<AgentMetrics>,
    config: LoopConfig,
}

impl EvictionLoopBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            manager: None,
            disk_info: None,
            active_pods: None,
            health: None,
            metrics: None,
            config: LoopConfig::default(),
        }
    }

    pub fn manager(mut self, manager: Arc<Manager>) -> Self {
        self.manager = Some(manager);
        self
    }

    pub fn disk_info(mut self, disk_info: Arc<dyn DiskInfoProvider>) -> Self {
        self.disk_info = Some(disk_info);
        self
    }

    pub fn active_pods(mut self, active_pods: ActivePodsFunc) -> Self {
        self.active_pods = Some(active_pods);
        self
    }

    pub fn health(mut self, health: HealthTracker) -> Self {
        self.health = Some(health);
        self
    }

    pub fn metrics(mut self, metrics: AgentMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Set the synchronize interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Build the eviction loop
    pub fn build(self) -> Result<EvictionLoop> {
        let manager = self
            .manager
            .ok_or_else(|| anyhow::anyhow!("Manager is required"))?;
        let disk_info = self
            .disk_info
            .ok_or_else(|| anyhow::anyhow!("Disk info provider is required"))?;
        let active_pods = self
            .active_pods
            .ok_or_else(|| anyhow::anyhow!("Active pods function is required"))?;
        let health = self
            .health
            .ok_or_else(|| anyhow::anyhow!("Health tracker is required"))?;

        Ok(EvictionLoop {
            manager,
            disk_info,
            active_pods,
            health,
            metrics: self.metrics.unwrap_or_default(),
            config: self.config,
        })
    }
}

impl Default for EvictionLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
