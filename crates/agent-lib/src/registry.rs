//! Active pod registry
//!
//! Tracks the pods currently scheduled on this node. The hosting system
//! replaces the set through the agent API; the eviction loop reads it to
//! build eviction candidates.

use crate::models::Pod;
use dashmap::DashMap;
use tracing::debug;

pub struct PodRegistry {
    /// Map of `namespace/name` -> Pod
    pods: DashMap<String, Pod>,
    node_name: String,
}

impl PodRegistry {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            pods: DashMap::new(),
            node_name: node_name.into(),
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Add or update a single pod.
    pub fn register(&self, pod: Pod) {
        debug!(pod = %pod.key(), "Registering pod");
        self.pods.insert(pod.key(), pod);
    }

    /// Remove a pod by `namespace/name` key.
    pub fn unregister(&self, key: &str) -> Option<Pod> {
        debug!(pod = %key, "Unregistering pod");
        self.pods.remove(key).map(|(_, pod)| pod)
    }

    pub fn get(&self, key: &str) -> Option<Pod> {
        self.pods.get(key).map(|entry| entry.clone())
    }

    /// Replace the whole active set.
    pub fn replace_all(&self, pods: Vec<Pod>) {
        self.pods.clear();
        for pod in pods {
            self.pods.insert(pod.key(), pod);
        }
        debug!(count = self.pods.len(), "Replaced active pod set");
    }

    pub fn list(&self) -> Vec<Pod> {
        self.pods.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.pods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }
}
