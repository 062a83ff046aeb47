//! Observability infrastructure for the eviction agent
//!
//! Provides:
//! - Prometheus metrics (synchronize latency, pressure state, eviction and
//!   admission counters)
//! - Structured JSON logging with tracing

use prometheus::{register_histogram, register_int_gauge, Histogram, IntGauge};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for synchronize latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AgentMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct AgentMetricsInner {
    synchronize_latency_seconds: Histogram,
    memory_pressure: IntGauge,
    disk_pressure: IntGauge,
    thresholds_violated: IntGauge,
    pods_tracked: IntGauge,
    evictions: IntGauge,
    eviction_errors: IntGauge,
    admission_denials: IntGauge,
    summary_fetch_errors: IntGauge,
}

impl AgentMetricsInner {
    fn new() -> Self {
        Self {
            synchronize_latency_seconds: register_histogram!(
                "eviction_agent_synchronize_latency_seconds",
                "Time spent in one eviction synchronize cycle",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register synchronize_latency_seconds"),

            memory_pressure: register_int_gauge!(
                "eviction_agent_memory_pressure",
                "Whether the node is currently reported under memory pressure (0 or 1)"
            )
            .expect("Failed to register memory_pressure"),

            disk_pressure: register_int_gauge!(
                "eviction_agent_disk_pressure",
                "Whether the node is currently reported under disk pressure (0 or 1)"
            )
            .expect("Failed to register disk_pressure"),

            thresholds_violated: register_int_gauge!(
                "eviction_agent_thresholds_violated",
                "Number of eviction thresholds violated in the last cycle"
            )
            .expect("Failed to register thresholds_violated"),

            pods_tracked: register_int_gauge!(
                "eviction_agent_pods_tracked",
                "Number of active pods known to the agent"
            )
            .expect("Failed to register pods_tracked"),

            evictions: register_int_gauge!(
                "eviction_agent_evictions_total",
                "Total number of pods evicted to relieve node pressure"
            )
            .expect("Failed to register evictions_total"),

            eviction_errors: register_int_gauge!(
                "eviction_agent_eviction_errors_total",
                "Total number of failed eviction attempts"
            )
            .expect("Failed to register eviction_errors_total"),

            admission_denials: register_int_gauge!(
                "eviction_agent_admission_denials_total",
                "Total number of pods denied admission while under pressure"
            )
            .expect("Failed to register admission_denials_total"),

            summary_fetch_errors: register_int_gauge!(
                "eviction_agent_summary_fetch_errors_total",
                "Total number of failed stats summary fetches"
            )
            .expect("Failed to register summary_fetch_errors_total"),
        }
    }
}

/// Agent metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct AgentMetrics {
    // This is just a marker - we use the global instance
    _private: (),
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AgentMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record a synchronize cycle latency observation
    pub fn observe_synchronize_latency(&self, duration_secs: f64) {
        self.inner().synchronize_latency_seconds.observe(duration_secs);
    }

    /// Update the reported pressure gauges
    pub fn set_pressure(&self, memory: bool, disk: bool) {
        self.inner().memory_pressure.set(memory as i64);
        self.inner().disk_pressure.set(disk as i64);
    }

    /// Update the violated threshold count for the last cycle
    pub fn set_thresholds_violated(&self, count: i64) {
        self.inner().thresholds_violated.set(count);
    }

    /// Update the active pod count
    pub fn set_pods_tracked(&self, count: i64) {
        self.inner().pods_tracked.set(count);
    }

    pub fn inc_evictions(&self) {
        self.inner().evictions.inc();
    }

    pub fn inc_eviction_errors(&self) {
        self.inner().eviction_errors.inc();
    }

    pub fn inc_admission_denials(&self) {
        self.inner().admission_denials.inc();
    }

    pub fn inc_summary_fetch_errors(&self) {
        self.inner().summary_fetch_errors.inc();
    }

    /// Current failed-fetch count, used by the control loop to track
    /// provider health across cycles.
    pub fn summary_fetch_errors(&self) -> i64 {
        self.inner().summary_fetch_errors.get()
    }
}

/// Structured logger for agent events
///
/// Provides consistent JSON-formatted logging for evictions, pressure
/// transitions, and admission decisions.
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    /// Log a pod eviction decision
    pub fn log_eviction(
        &self,
        pod_name: &str,
        namespace: &str,
        resource: &str,
        grace_period_override: i64,
    ) {
        warn!(
            event = "pod_evicted",
            node = %self.node_name,
            pod_name = %pod_name,
            namespace = %namespace,
            resource = %resource,
            grace_period_override = grace_period_override,
            "Evicting pod to reclaim node resources"
        );
    }

    /// Log a pressure condition transition
    pub fn log_pressure_change(&self, condition: &str, active: bool) {
        if active {
            warn!(
                event = "pressure_change",
                node = %self.node_name,
                condition = %condition,
                active = true,
                "Node entered pressure condition"
            );
        } else {
            info!(
                event = "pressure_change",
                node = %self.node_name,
                condition = %condition,
                active = false,
                "Node pressure condition cleared"
            );
        }
    }

    /// Log a denied admission
    pub fn log_admission_denied(&self, pod_name: &str, namespace: &str, reason: &str) {
        info!(
            event = "admission_denied",
            node = %self.node_name,
            pod_name = %pod_name,
            namespace = %namespace,
            reason = %reason,
            "Pod admission denied while node is under pressure"
        );
    }

    /// Log a skipped synchronize cycle
    pub fn log_sync_failure(&self, error: &str) {
        warn!(
            event = "sync_failure",
            node = %self.node_name,
            error = %error,
            "Skipping eviction cycle, previous pressure state preserved"
        );
    }

    /// Log agent startup
    pub fn log_startup(&self, version: &str, threshold_count: usize) {
        info!(
            event = "agent_started",
            node = %self.node_name,
            agent_version = %version,
            thresholds = threshold_count,
            "Eviction agent started"
        );
    }

    /// Log agent shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Eviction agent shutting down"
        );
    }
}
