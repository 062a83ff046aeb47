//! Node pressure eviction
//!
//! This module provides:
//! - Threshold configuration with hard and soft (grace period) semantics
//! - Signal observation from stats summaries
//! - Pressure state with anti-flap transition dampening
//! - QoS-aware victim ranking and single-victim eviction per cycle
//! - An admission gate consistent with the reported pressure

mod manager;
mod ranking;
mod thresholds;
mod types;
mod r#loop;

#[cfg(test)]
mod tests;

pub use manager::{ActivePodsFunc, DiskInfoProvider, Manager, ManagerBuilder, PodKiller};
pub use r#loop::{EvictionLoop, EvictionLoopBuilder, LoopConfig};
pub use ranking::{rank_pods_for_eviction, pod_stats_by_key};
pub use thresholds::{
    parse_threshold_config, parse_duration, signal_observations, thresholds_met,
    SignalObservations,
};
pub use types::{
    Config, NodeCondition, Operator, PodAdmitAttributes, PodAdmitResult, ReclaimResource, Signal,
    Threshold,
};
