//! Eviction manager
//!
//! The control-loop core: consumes summary snapshots, tracks threshold
//! violations over time, reports node pressure, gates admission, and evicts
//! the worst-ranked pod once a threshold's grace period is spent.

use super::ranking;
use super::thresholds::{
    node_conditions, node_conditions_last_observed_at, node_conditions_observed_since,
    signal_observations, thresholds_first_observed_at, thresholds_met,
    thresholds_met_grace_period,
};
use super::types::{
    Config, NodeCondition, PodAdmitAttributes, PodAdmitResult, Threshold,
};
use crate::clock::Clock;
use crate::events::{reasons, EventRecorder, EventType, ObjectReference};
use crate::models::{Pod, PodPhase, PodStatus};
use crate::observability::{AgentMetrics, StructuredLogger};
use crate::qos::{qos_class, QosClass};
use crate::stats::SummaryProvider;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, warn};

/// Provides layout facts about the node's filesystems.
pub trait DiskInfoProvider: Send + Sync {
    /// Whether container images live on a filesystem separate from the
    /// node's root filesystem.
    fn has_dedicated_image_fs(&self) -> Result<bool>;
}

/// Terminates a pod. `grace_period_override` of zero means immediate kill.
#[async_trait]
pub trait PodKiller: Send + Sync {
    async fn kill_pod(
        &self,
        pod: &Pod,
        status: PodStatus,
        grace_period_override: Option<i64>,
    ) -> Result<()>;
}

/// Returns the pods currently scheduled on this node.
pub type ActivePodsFunc = Arc<dyn Fn() -> Vec<Pod> + Send + Sync>;

/// Violation bookkeeping written by `synchronize` and read by the pressure
/// queries and the admission gate.
#[derive(Default)]
struct PressureState {
    /// Dampened condition set reported externally.
    node_conditions: Vec<NodeCondition>,
    node_conditions_last_observed_at: HashMap<NodeCondition, Instant>,
    thresholds_first_observed_at: HashMap<Threshold, Instant>,
}

pub struct Manager {
    config: Config,
    clock: Arc<dyn Clock>,
    summary_provider: Arc<dyn SummaryProvider>,
    pod_killer: Arc<dyn PodKiller>,
    recorder: Arc<dyn EventRecorder>,
    node_ref: ObjectReference,
    metrics: AgentMetrics,
    logger: StructuredLogger,
    state: RwLock<PressureState>,
}

/// Builder for the eviction manager
pub struct ManagerBuilder {
    config: Config,
    clock: Option<Arc<dyn Clock>>,
    summary_provider: Option<Arc<dyn SummaryProvider>>,
    pod_killer: Option<Arc<dyn PodKiller>>,
    recorder: Option<Arc<dyn EventRecorder>>,
    node_ref: Option<ObjectReference>,
    metrics: Option<AgentMetrics>,
}

impl ManagerBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            clock: None,
            summary_provider: None,
            pod_killer: None,
            recorder: None,
            node_ref: None,
            metrics: None,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn summary_provider(mut self, provider: Arc<dyn SummaryProvider>) -> Self {
        self.summary_provider = Some(provider);
        self
    }

    pub fn pod_killer(mut self, killer: Arc<dyn PodKiller>) -> Self {
        self.pod_killer = Some(killer);
        self
    }

    pub fn recorder(mut self, recorder: Arc<dyn EventRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn node_ref(mut self, node_ref: ObjectReference) -> Self {
        self.node_ref = Some(node_ref);
        self
    }

    pub fn metrics(mut self, metrics: AgentMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validate the configuration and build the manager. Invalid
    /// configuration is a startup error; nothing is retried later.
    pub fn build(self) -> Result<Manager> {
        validate_config(&self.config)?;

        let node_ref = self
            .node_ref
            .ok_or_else(|| anyhow::anyhow!("Node reference is required"))?;
        let summary_provider = self
            .summary_provider
            .ok_or_else(|| anyhow::anyhow!("Summary provider is required"))?;
        let pod_killer = self
            .pod_killer
            .ok_or_else(|| anyhow::anyhow!("Pod killer is required"))?;
        let recorder = self
            .recorder
            .ok_or_else(|| anyhow::anyhow!("Event recorder is required"))?;
        let clock = self
            .clock
            .ok_or_else(|| anyhow::anyhow!("Clock is required"))?;

        let logger = StructuredLogger::new(&node_ref.name);
        Ok(Manager {
            config: self.config,
            clock,
            summary_provider,
            pod_killer,
            recorder,
            node_ref,
            metrics: self.metrics.unwrap_or_default(),
            logger,
            state: RwLock::new(PressureState::default()),
        })
    }
}

fn validate_config(config: &Config) -> Result<()> {
    if config.max_pod_grace_period_seconds < 0 {
        bail!("max pod grace period must not be negative");
    }
    for threshold in &config.thresholds {
        if threshold.value.millis() <= 0 {
            bail!("eviction threshold {} must be positive", threshold);
        }
    }
    for (i, a) in config.thresholds.iter().enumerate() {
        for b in &config.thresholds[i + 1..] {
            if a.signal == b.signal && a.grace_period == b.grace_period {
                bail!("duplicate eviction threshold for {}", a.signal);
            }
        }
    }
    Ok(())
}

impl Manager {
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether the node currently reports memory pressure, including the
    /// dampening window after signals clear.
    pub fn is_under_memory_pressure(&self) -> bool {
        self.has_condition(NodeCondition::MemoryPressure)
    }

    /// Whether the node currently reports disk pressure, including the
    /// dampening window after signals clear.
    pub fn is_under_disk_pressure(&self) -> bool {
        self.has_condition(NodeCondition::DiskPressure)
    }

    fn has_condition(&self, condition: NodeCondition) -> bool {
        self.state
            .read()
            .unwrap()
            .node_conditions
            .contains(&condition)
    }

    /// Admission gate consulted by the pod lifecycle subsystem.
    ///
    /// A pure function of the dampened pressure set and the candidate's QoS
    /// class: disk pressure denies everything, memory pressure denies only
    /// best-effort pods. Takes a shared lock and never blocks.
    pub fn admit(&self, attrs: &PodAdmitAttributes<'_>) -> PodAdmitResult {
        let conditions = self.state.read().unwrap().node_conditions.clone();
        if conditions.is_empty() {
            return PodAdmitResult::admitted();
        }

        if conditions.contains(&NodeCondition::DiskPressure) {
            self.metrics.inc_admission_denials();
            self.logger
                .log_admission_denied(&attrs.pod.name, &attrs.pod.namespace, reasons::OUT_OF_DISK);
            return PodAdmitResult::denied(
                reasons::OUT_OF_DISK,
                "The node is under disk pressure and cannot accept pods",
            );
        }

        // memory pressure only restricts pods with no resource guarantees
        if qos_class(attrs.pod) != QosClass::BestEffort {
            return PodAdmitResult::admitted();
        }
        self.metrics.inc_admission_denials();
        self.logger
            .log_admission_denied(&attrs.pod.name, &attrs.pod.namespace, reasons::OUT_OF_MEMORY);
        PodAdmitResult::denied(
            reasons::OUT_OF_MEMORY,
            "The node is under memory pressure and cannot accept best-effort pods",
        )
    }

    /// One control-loop cycle: observe, update bookkeeping, and evict at
    /// most one pod. Not re-entrant; the driver serializes calls.
    ///
    /// Transient input failures skip the cycle and leave all state, so a
    /// condition raised earlier keeps reporting until real observations
    /// clear it.
    pub async fn synchronize(
        &self,
        disk_info: &dyn DiskInfoProvider,
        active_pods: &ActivePodsFunc,
    ) {
        let summary = match self.summary_provider.get().await {
            Ok(summary) => summary,
            Err(error) => {
                self.metrics.inc_summary_fetch_errors();
                self.logger.log_sync_failure(&error.to_string());
                return;
            }
        };
        let has_dedicated_image_fs = match disk_info.has_dedicated_image_fs() {
            Ok(dedicated) => dedicated,
            Err(error) => {
                self.logger.log_sync_failure(&error.to_string());
                return;
            }
        };

        let observations = signal_observations(&summary, has_dedicated_image_fs);
        let violated = thresholds_met(&self.config.thresholds, &observations);
        let now = self.clock.now();

        // update bookkeeping under the write lock; nothing below awaits
        let (actionable, reported, raised, cleared) = {
            let mut state = self.state.write().unwrap();
            let first_observed = thresholds_first_observed_at(
                &violated,
                &self.config.thresholds,
                &observations,
                &state.thresholds_first_observed_at,
                now,
            );
            let raw = node_conditions(&violated);
            let last_observed =
                node_conditions_last_observed_at(&raw, &state.node_conditions_last_observed_at, now);
            let reported = node_conditions_observed_since(
                &last_observed,
                self.config.pressure_transition_period,
                now,
            );

            let mut actionable = thresholds_met_grace_period(&violated, &first_observed, now);
            // hard thresholds outrank soft, longer violations outrank newer
            actionable.sort_by_key(|t| {
                (!t.is_hard(), first_observed.get(t).copied().unwrap_or(now))
            });

            let raised: Vec<_> = reported
                .iter()
                .filter(|c| !state.node_conditions.contains(c))
                .copied()
                .collect();
            let cleared: Vec<_> = state
                .node_conditions
                .iter()
                .filter(|c| !reported.contains(c))
                .copied()
                .collect();

            state.thresholds_first_observed_at = first_observed;
            state.node_conditions_last_observed_at = last_observed;
            state.node_conditions = reported.clone();
            (actionable, reported, raised, cleared)
        };

        for condition in raised {
            self.logger.log_pressure_change(condition.as_str(), true);
        }
        for condition in cleared {
            self.logger.log_pressure_change(condition.as_str(), false);
        }
        self.metrics.set_pressure(
            reported.contains(&NodeCondition::MemoryPressure),
            reported.contains(&NodeCondition::DiskPressure),
        );
        self.metrics.set_thresholds_violated(violated.len() as i64);

        let Some(trigger) = actionable.first() else {
            debug!(
                violated = violated.len(),
                "No eviction threshold has met its grace period"
            );
            return;
        };

        let resource = trigger.signal.reclaim_resource();
        self.recorder.eventf(
            &self.node_ref,
            EventType::Warning,
            reasons::EVICTION_THRESHOLD_MET,
            format!("Attempting to reclaim {}", resource),
        );

        let mut pods = active_pods();
        if pods.is_empty() {
            warn!(resource = %resource, "Eviction threshold met but no active pods");
            self.recorder.eventf(
                &self.node_ref,
                EventType::Warning,
                reasons::EVICTION_THRESHOLD_MET,
                format!("No eviction candidates while attempting to reclaim {}", resource),
            );
            return;
        }

        let stats = ranking::pod_stats_by_key(&summary);
        ranking::rank_pods_for_eviction(&mut pods, resource, &stats);
        let victim = pods.swap_remove(0);

        let grace_period_override = if trigger.is_hard() {
            0
        } else {
            self.config.max_pod_grace_period_seconds
        };
        let status = PodStatus {
            phase: PodPhase::Failed,
            reason: reasons::EVICTED.to_string(),
            message: format!("The node was low on {}.", resource),
        };
        self.logger.log_eviction(
            &victim.name,
            &victim.namespace,
            resource.as_str(),
            grace_period_override,
        );

        // one victim per cycle; a failed kill is retried by the next cycle's
        // re-evaluation
        match self
            .pod_killer
            .kill_pod(&victim, status, Some(grace_period_override))
            .await
        {
            Ok(()) => self.metrics.inc_evictions(),
            Err(error) => {
                self.metrics.inc_eviction_errors();
                warn!(pod = %victim.key(), error = %error, "Failed to evict pod");
                self.recorder.eventf(
                    &ObjectReference::pod(&victim),
                    EventType::Warning,
                    reasons::EVICTED,
                    format!("Eviction failed: {}", error),
                );
            }
        }
    }
}
