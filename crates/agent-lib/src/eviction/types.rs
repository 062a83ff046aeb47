//! Threshold model and admission types

use crate::models::Pod;
use crate::quantity::Quantity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// An observable node-level quantity that eviction thresholds compare
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    /// Available memory on the node
    MemoryAvailable,
    /// Available bytes on the node (root) filesystem
    NodeFsAvailable,
    /// Free inodes on the node filesystem
    NodeFsInodesFree,
    /// Available bytes on the image filesystem
    ImageFsAvailable,
    /// Free inodes on the image filesystem
    ImageFsInodesFree,
}

impl Signal {
    pub const ALL: [Signal; 5] = [
        Signal::MemoryAvailable,
        Signal::NodeFsAvailable,
        Signal::NodeFsInodesFree,
        Signal::ImageFsAvailable,
        Signal::ImageFsInodesFree,
    ];

    /// Operator-facing signal name used in threshold flags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::MemoryAvailable => "memory.available",
            Signal::NodeFsAvailable => "nodefs.available",
            Signal::NodeFsInodesFree => "nodefs.inodesFree",
            Signal::ImageFsAvailable => "imagefs.available",
            Signal::ImageFsInodesFree => "imagefs.inodesFree",
        }
    }

    pub fn parse(name: &str) -> Option<Signal> {
        Signal::ALL.iter().copied().find(|s| s.as_str() == name)
    }

    /// The node condition this signal contributes to.
    pub fn condition(&self) -> NodeCondition {
        match self {
            Signal::MemoryAvailable => NodeCondition::MemoryPressure,
            Signal::NodeFsAvailable
            | Signal::NodeFsInodesFree
            | Signal::ImageFsAvailable
            | Signal::ImageFsInodesFree => NodeCondition::DiskPressure,
        }
    }

    /// The resource reclaimed by evicting pods for this signal, which also
    /// selects the ranking policy.
    pub fn reclaim_resource(&self) -> ReclaimResource {
        match self {
            Signal::MemoryAvailable => ReclaimResource::Memory,
            Signal::NodeFsAvailable | Signal::ImageFsAvailable => {
                ReclaimResource::EphemeralStorage
            }
            Signal::NodeFsInodesFree | Signal::ImageFsInodesFree => ReclaimResource::Inodes,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison direction for a threshold. Only `LessThan` exists: pressure
/// means an availability signal dropped below the configured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    LessThan,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::LessThan => "<",
        }
    }
}

/// An operator-configured eviction threshold.
///
/// A zero grace period makes the threshold hard: eviction fires on the
/// first violating observation with no grace for the victim. A positive
/// grace period makes it soft: the violation must persist that long, and
/// the victim gets the configured maximum pod grace period.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Threshold {
    pub signal: Signal,
    pub operator: Operator,
    pub value: Quantity,
    pub grace_period: Duration,
}

impl Threshold {
    pub fn hard(signal: Signal, value: Quantity) -> Self {
        Self {
            signal,
            operator: Operator::LessThan,
            value,
            grace_period: Duration::ZERO,
        }
    }

    pub fn soft(signal: Signal, value: Quantity, grace_period: Duration) -> Self {
        Self {
            signal,
            operator: Operator::LessThan,
            value,
            grace_period,
        }
    }

    pub fn is_hard(&self) -> bool {
        self.grace_period.is_zero()
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.signal, self.operator.as_str(), self.value)
    }
}

/// Eviction manager configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Grace period granted to victims of soft-threshold evictions.
    pub max_pod_grace_period_seconds: i64,
    /// Minimum time a pressure condition stays raised after its signals
    /// clear.
    pub pressure_transition_period: Duration,
    /// Configured thresholds; a signal may carry both a hard and a soft
    /// entry.
    pub thresholds: Vec<Threshold>,
}

/// Node-level pressure condition derived from violated thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCondition {
    MemoryPressure,
    DiskPressure,
}

impl NodeCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeCondition::MemoryPressure => "MemoryPressure",
            NodeCondition::DiskPressure => "DiskPressure",
        }
    }
}

impl fmt::Display for NodeCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource reclaimed by an eviction, naming the ranking policy to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReclaimResource {
    Memory,
    EphemeralStorage,
    Inodes,
}

impl ReclaimResource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReclaimResource::Memory => "memory",
            ReclaimResource::EphemeralStorage => "ephemeral-storage",
            ReclaimResource::Inodes => "inodes",
        }
    }
}

impl fmt::Display for ReclaimResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes of a pod asking to be admitted to the node.
#[derive(Debug, Clone, Copy)]
pub struct PodAdmitAttributes<'a> {
    pub pod: &'a Pod,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodAdmitResult {
    pub admit: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

impl PodAdmitResult {
    pub fn admitted() -> Self {
        Self {
            admit: true,
            reason: String::new(),
            message: String::new(),
        }
    }

    pub fn denied(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            admit: false,
            reason: reason.into(),
            message: message.into(),
        }
    }
}
