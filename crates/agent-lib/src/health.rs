//! Health tracking for the eviction agent
//!
//! Health is derived from what the control loop actually does: whether
//! synchronize cycles keep completing against the stats source. A run of
//! failed cycles means the agent is flying blind on stale pressure state,
//! which is what the liveness and readiness probes need to surface.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Consecutive failed cycles before the agent reports degraded.
const DEGRADED_AFTER_FAILURES: u32 = 3;

/// Consecutive failed cycles before the agent reports unhealthy. At this
/// point the pressure state is too stale to trust.
const UNHEALTHY_AFTER_FAILURES: u32 = 10;

/// Overall agent health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Cycles are completing normally
    Healthy,
    /// Recent cycles failed but the pressure state is still fresh enough
    Degraded,
    /// Cycles have been failing long enough that eviction and admission
    /// decisions are based on stale observations
    Unhealthy,
}

/// Liveness probe response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    /// Synchronize cycles attempted since startup
    pub cycles: u64,
    /// Failed cycles since the last successful one
    pub consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Readiness probe response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct HealthState {
    initialized: bool,
    cycles: u64,
    consecutive_failures: u32,
    last_error: Option<String>,
}

/// Cycle-outcome tracker shared between the control loop and the probe
/// endpoints
#[derive(Debug, Clone, Default)]
pub struct HealthTracker {
    state: Arc<RwLock<HealthState>>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark startup wiring as complete. Readiness still waits for the
    /// first synchronize cycle.
    pub async fn set_initialized(&self) {
        let mut state = self.state.write().await;
        state.initialized = true;
    }

    /// Record a synchronize cycle that ran to completion.
    pub async fn record_cycle_success(&self) {
        let mut state = self.state.write().await;
        state.cycles += 1;
        state.consecutive_failures = 0;
        state.last_error = None;
    }

    /// Record a cycle skipped on a transient input failure.
    pub async fn record_cycle_failure(&self, error: impl Into<String>) {
        let mut state = self.state.write().await;
        state.cycles += 1;
        state.consecutive_failures += 1;
        state.last_error = Some(error.into());
    }

    fn status_of(state: &HealthState) -> HealthStatus {
        if state.consecutive_failures >= UNHEALTHY_AFTER_FAILURES {
            HealthStatus::Unhealthy
        } else if state.consecutive_failures >= DEGRADED_AFTER_FAILURES {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    /// Get health response
    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        let status = Self::status_of(&state);
        let message = match status {
            HealthStatus::Healthy => None,
            _ => Some(format!(
                "{} consecutive failed cycles{}",
                state.consecutive_failures,
                state
                    .last_error
                    .as_deref()
                    .map(|e| format!(": {}", e))
                    .unwrap_or_default()
            )),
        };
        HealthResponse {
            status,
            cycles: state.cycles,
            consecutive_failures: state.consecutive_failures,
            message,
        }
    }

    /// Get readiness response. The agent is not ready until the first
    /// cycle has completed: before that the admission gate has never seen
    /// the node and would wave everything through.
    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;

        if !state.initialized {
            return ReadinessResponse {
                ready: false,
                reason: Some("Agent not yet initialized".to_string()),
            };
        }
        if state.cycles == 0 {
            return ReadinessResponse {
                ready: false,
                reason: Some("No eviction cycle has run yet".to_string()),
            };
        }
        if Self::status_of(&state) == HealthStatus::Unhealthy {
            return ReadinessResponse {
                ready: false,
                reason: Some("Pressure state is stale".to_string()),
            };
        }

        ReadinessResponse {
            ready: true,
            reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_healthy_before_any_cycle() {
        let tracker = HealthTracker::new();
        let health = tracker.health().await;

        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.cycles, 0);
        assert!(health.message.is_none());
    }

    #[tokio::test]
    async fn test_not_ready_until_initialized_and_cycled() {
        let tracker = HealthTracker::new();
        assert!(!tracker.readiness().await.ready);

        // initialization alone is not enough
        tracker.set_initialized().await;
        let readiness = tracker.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(
            readiness.reason.as_deref(),
            Some("No eviction cycle has run yet")
        );

        tracker.record_cycle_success().await;
        assert!(tracker.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_degraded_after_consecutive_failures() {
        let tracker = HealthTracker::new();

        for _ in 0..DEGRADED_AFTER_FAILURES {
            tracker
                .record_cycle_failure("stats endpoint unreachable")
                .await;
        }

        let health = tracker.health().await;
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.consecutive_failures, DEGRADED_AFTER_FAILURES);
        assert!(health
            .message
            .unwrap()
            .contains("stats endpoint unreachable"));
    }

    #[tokio::test]
    async fn test_unhealthy_after_sustained_failures() {
        let tracker = HealthTracker::new();
        tracker.set_initialized().await;
        tracker.record_cycle_success().await;

        for _ in 0..UNHEALTHY_AFTER_FAILURES {
            tracker.record_cycle_failure("summary fetch failed").await;
        }

        assert_eq!(tracker.health().await.status, HealthStatus::Unhealthy);
        // stale pressure state also fails readiness
        let readiness = tracker.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Pressure state is stale"));
    }

    #[tokio::test]
    async fn test_single_success_resets_failure_run() {
        let tracker = HealthTracker::new();

        for _ in 0..DEGRADED_AFTER_FAILURES {
            tracker.record_cycle_failure("summary fetch failed").await;
        }
        assert_eq!(tracker.health().await.status, HealthStatus::Degraded);

        tracker.record_cycle_success().await;
        let health = tracker.health().await;
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.consecutive_failures, 0);
        assert!(health.message.is_none());
    }

    #[tokio::test]
    async fn test_cycles_count_both_outcomes() {
        let tracker = HealthTracker::new();
        tracker.record_cycle_success().await;
        tracker.record_cycle_failure("summary fetch failed").await;
        tracker.record_cycle_success().await;

        assert_eq!(tracker.health().await.cycles, 3);
    }
}
