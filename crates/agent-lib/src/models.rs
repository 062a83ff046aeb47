//! Core data models for the eviction agent

use crate::quantity::Quantity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Resource names tracked in pod requests and limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceName {
    Cpu,
    Memory,
    EphemeralStorage,
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceName::Cpu => write!(f, "cpu"),
            ResourceName::Memory => write!(f, "memory"),
            ResourceName::EphemeralStorage => write!(f, "ephemeral-storage"),
        }
    }
}

/// Named resource amounts, e.g. `{cpu: 100m, memory: 1Gi}`
pub type ResourceList = BTreeMap<ResourceName, Quantity>;

/// Declared requests and limits for a container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    #[serde(default)]
    pub requests: ResourceList,
    #[serde(default)]
    pub limits: ResourceList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    #[serde(default)]
    pub resources: ResourceRequirements,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodSpec {
    pub containers: Vec<Container>,
}

/// The unit of scheduling: a named group of containers with shared
/// lifecycle and resource accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub uid: String,
    pub spec: PodSpec,
}

impl Pod {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        containers: Vec<Container>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            uid: String::new(),
            spec: PodSpec { containers },
        }
    }

    /// Registry key, `namespace/name`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Total declared request for a resource across all containers.
    pub fn request(&self, resource: ResourceName) -> Quantity {
        let mut total = Quantity::zero();
        for container in &self.spec.containers {
            if let Some(q) = container.resources.requests.get(&resource) {
                total += *q;
            }
        }
        total
    }
}

/// Terminal phase assigned to an evicted pod
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// Status handed to the pod killer alongside the victim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodStatus {
    pub phase: PodPhase,
    pub reason: String,
    pub message: String,
}
