//! Event recording for the audit trail
//!
//! The manager reports eviction activity as fire-and-forget events against
//! the node or a pod. The production recorder emits structured log events;
//! tests use a capturing fake.

use crate::models::Pod;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{info, warn};

/// Event classification, mirroring the Kubernetes event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Normal,
    Warning,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Normal => "Normal",
            EventType::Warning => "Warning",
        }
    }
}

/// Well-known event reasons emitted by the eviction manager.
pub mod reasons {
    pub const EVICTION_THRESHOLD_MET: &str = "EvictionThresholdMet";
    pub const EVICTED: &str = "Evicted";
    pub const OUT_OF_MEMORY: &str = "OutOfMemory";
    pub const OUT_OF_DISK: &str = "OutOfDisk";
}

/// Reference to the object an event is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub uid: String,
}

impl ObjectReference {
    pub fn node(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: "Node".to_string(),
            uid: name.clone(),
            name,
            namespace: String::new(),
        }
    }

    pub fn pod(pod: &Pod) -> Self {
        Self {
            kind: "Pod".to_string(),
            name: pod.name.clone(),
            namespace: pod.namespace.clone(),
            uid: pod.uid.clone(),
        }
    }
}

/// A recorded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub object: ObjectReference,
    pub event_type: EventType,
    pub reason: String,
    pub message: String,
    /// Wall-clock seconds; audit only, never used for eviction timing.
    pub timestamp: i64,
}

/// Fire-and-forget event sink.
pub trait EventRecorder: Send + Sync {
    fn eventf(&self, object: &ObjectReference, event_type: EventType, reason: &str, message: String);
}

/// Emits events as structured tracing records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRecorder;

impl EventRecorder for TracingRecorder {
    fn eventf(&self, object: &ObjectReference, event_type: EventType, reason: &str, message: String) {
        match event_type {
            EventType::Warning => warn!(
                event = "node_event",
                kind = %object.kind,
                object = %object.name,
                event_type = event_type.as_str(),
                reason = %reason,
                "{}", message
            ),
            EventType::Normal => info!(
                event = "node_event",
                kind = %object.kind,
                object = %object.name,
                event_type = event_type.as_str(),
                reason = %reason,
                "{}", message
            ),
        }
    }
}

/// Captures events for test assertions.
#[derive(Debug, Default)]
pub struct FakeRecorder {
    events: Mutex<Vec<Event>>,
}

impl FakeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Drain recorded events.
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl EventRecorder for FakeRecorder {
    fn eventf(&self, object: &ObjectReference, event_type: EventType, reason: &str, message: String) {
        self.events.lock().unwrap().push(Event {
            object: object.clone(),
            event_type,
            reason: reason.to_string(),
            message,
            timestamp: chrono::Utc::now().timestamp(),
        });
    }
}
