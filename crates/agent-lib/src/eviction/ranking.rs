//! Pod ranking for eviction
//!
//! Orders eviction candidates from evict-first to evict-last by composing
//! three comparators: QoS tier, usage above declared request, and absolute
//! usage of the starved resource.

use super::types::ReclaimResource;
use crate::models::{Pod, ResourceName};
use crate::qos::qos_class;
use crate::quantity::Quantity;
use crate::stats::{PodStats, Summary};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Per-pod stats lookup keyed by `namespace/name`.
pub fn pod_stats_by_key(summary: &Summary) -> HashMap<String, PodStats> {
    summary
        .pods
        .iter()
        .map(|stats| {
            let key = format!("{}/{}", stats.pod_ref.namespace, stats.pod_ref.name);
            (key, stats.clone())
        })
        .collect()
}

/// Memory usage of a pod: the pod-level working set, falling back to the
/// sum of container working sets.
pub fn memory_usage(stats: &PodStats) -> Quantity {
    if let Some(working_set) = stats.memory.as_ref().and_then(|m| m.working_set_bytes) {
        return Quantity::from_bytes(working_set);
    }
    let mut total = Quantity::zero();
    for container in &stats.containers {
        if let Some(working_set) = container.memory.as_ref().and_then(|m| m.working_set_bytes) {
            total += Quantity::from_bytes(working_set);
        }
    }
    total
}

/// Local disk usage of a pod: container root filesystems, container logs,
/// and local volumes.
pub fn disk_usage(stats: &PodStats) -> Quantity {
    let mut total = Quantity::zero();
    for container in &stats.containers {
        if let Some(used) = container.rootfs.as_ref().and_then(|fs| fs.used_bytes) {
            total += Quantity::from_bytes(used);
        }
        if let Some(used) = container.logs.as_ref().and_then(|fs| fs.used_bytes) {
            total += Quantity::from_bytes(used);
        }
    }
    for volume in &stats.volume_stats {
        if let Some(used) = volume.fs.used_bytes {
            total += Quantity::from_bytes(used);
        }
    }
    total
}

/// Measured usage of the starved resource. A pod without stats counts as
/// zero usage and sorts toward evict-last within its tier.
fn usage(pod: &Pod, resource: ReclaimResource, stats: &HashMap<String, PodStats>) -> Quantity {
    let Some(pod_stats) = stats.get(&pod.key()) else {
        return Quantity::zero();
    };
    match resource {
        ReclaimResource::Memory => memory_usage(pod_stats),
        // no per-pod inode accounting exists, so inode-starved evictions
        // rank by disk footprint
        ReclaimResource::EphemeralStorage | ReclaimResource::Inodes => disk_usage(pod_stats),
    }
}

/// Declared request for the starved resource.
fn request(pod: &Pod, resource: ReclaimResource) -> Quantity {
    match resource {
        ReclaimResource::Memory => pod.request(ResourceName::Memory),
        ReclaimResource::EphemeralStorage => pod.request(ResourceName::EphemeralStorage),
        ReclaimResource::Inodes => Quantity::zero(),
    }
}

/// Order by QoS tier: best-effort pods are evicted before burstable, which
/// go before guaranteed.
pub fn compare_qos(a: &Pod, b: &Pod) -> Ordering {
    qos_class(a).cmp(&qos_class(b))
}

/// Order by usage above declared request, descending: pods furthest over
/// their own request are evicted first.
pub fn compare_usage_over_request(
    a: &Pod,
    b: &Pod,
    resource: ReclaimResource,
    stats: &HashMap<String, PodStats>,
) -> Ordering {
    let over_a = usage(a, resource, stats).saturating_sub(request(a, resource));
    let over_b = usage(b, resource, stats).saturating_sub(request(b, resource));
    over_b.cmp(&over_a)
}

/// Order by absolute usage, descending.
pub fn compare_usage(
    a: &Pod,
    b: &Pod,
    resource: ReclaimResource,
    stats: &HashMap<String, PodStats>,
) -> Ordering {
    usage(b, resource, stats).cmp(&usage(a, resource, stats))
}

/// Sort candidates so the first element is the next victim. The sort is
/// stable: fully tied pods keep their input order.
pub fn rank_pods_for_eviction(
    pods: &mut [Pod],
    resource: ReclaimResource,
    stats: &HashMap<String, PodStats>,
) {
    pods.sort_by(|a, b| {
        compare_qos(a, b)
            .then_with(|| compare_usage_over_request(a, b, resource, stats))
            .then_with(|| compare_usage(a, b, resource, stats))
    });
}
