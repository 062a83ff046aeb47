//! Quality-of-service classification
//!
//! Pods are classed by how their declared requests relate to their limits.
//! The class drives eviction ordering: best-effort pods go first, guaranteed
//! pods last.

use crate::models::Pod;
use serde::{Deserialize, Serialize};
use std::fmt;

/// QoS class, ordered from first-evicted to last-evicted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum QosClass {
    /// No container declares any request or limit.
    BestEffort,
    /// Some resources are declared, but requests and limits differ.
    Burstable,
    /// Every container sets requests equal to limits.
    Guaranteed,
}

impl fmt::Display for QosClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QosClass::BestEffort => write!(f, "BestEffort"),
            QosClass::Burstable => write!(f, "Burstable"),
            QosClass::Guaranteed => write!(f, "Guaranteed"),
        }
    }
}

/// Derive the QoS class from the pod's container resource declarations.
pub fn qos_class(pod: &Pod) -> QosClass {
    let mut any_declared = false;
    let mut all_guaranteed = true;

    for container in &pod.spec.containers {
        let resources = &container.resources;
        if !resources.requests.is_empty() || !resources.limits.is_empty() {
            any_declared = true;
        }
        if resources.limits.is_empty() || resources.requests != resources.limits {
            all_guaranteed = false;
        }
    }

    if !any_declared {
        QosClass::BestEffort
    } else if all_guaranteed {
        QosClass::Guaranteed
    } else {
        QosClass::Burstable
    }
}
