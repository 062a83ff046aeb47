//! Scenario tests for the eviction manager
//!
//! Drives the manager through pressure scenarios with a stepped fake clock
//! and mock collaborators: threshold trips within and past grace periods,
//! hard evictions, transition dampening, and the admission gate.

use super::manager::{ActivePodsFunc, DiskInfoProvider, ManagerBuilder, PodKiller};
use super::types::{Config, PodAdmitAttributes, Signal, Threshold};
use crate::clock::FakeClock;
use crate::events::{reasons, FakeRecorder, ObjectReference};
use crate::models::{
    Container, Pod, PodPhase, PodStatus, ResourceList, ResourceName, ResourceRequirements,
};
use crate::quantity::Quantity;
use crate::stats::{
    ContainerStats, FsStats, MemoryStats, NodeStats, PodReference, PodStats, RuntimeStats,
    Summary, SummaryProvider,
};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct MockPodKiller {
    calls: Mutex<Vec<(Pod, PodStatus, Option<i64>)>>,
}

impl MockPodKiller {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
        })
    }

    fn last(&self) -> Option<(Pod, PodStatus, Option<i64>)> {
        self.calls.lock().unwrap().last().cloned()
    }

    fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl PodKiller for MockPodKiller {
    async fn kill_pod(
        &self,
        pod: &Pod,
        status: PodStatus,
        grace_period_override: Option<i64>,
    ) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((pod.clone(), status, grace_period_override));
        Ok(())
    }
}

struct FailingPodKiller {
    attempts: Mutex<usize>,
}

impl FailingPodKiller {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            attempts: Mutex::new(0),
        })
    }

    fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl PodKiller for FailingPodKiller {
    async fn kill_pod(
        &self,
        _pod: &Pod,
        _status: PodStatus,
        _grace_period_override: Option<i64>,
    ) -> Result<()> {
        *self.attempts.lock().unwrap() += 1;
        anyhow::bail!("container runtime unavailable")
    }
}

struct MockDiskInfoProvider {
    dedicated_image_fs: bool,
}

impl DiskInfoProvider for MockDiskInfoProvider {
    fn has_dedicated_image_fs(&self) -> Result<bool> {
        Ok(self.dedicated_image_fs)
    }
}

struct FakeSummaryProvider {
    result: Mutex<Summary>,
}

impl FakeSummaryProvider {
    fn new(summary: Summary) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(summary),
        })
    }

    fn set(&self, summary: Summary) {
        *self.result.lock().unwrap() = summary;
    }
}

#[async_trait]
impl SummaryProvider for FakeSummaryProvider {
    async fn get(&self) -> Result<Summary> {
        Ok(self.result.lock().unwrap().clone())
    }
}

fn resources(cpu: &str, memory: &str) -> ResourceList {
    let mut list = ResourceList::new();
    if !cpu.is_empty() {
        list.insert(ResourceName::Cpu, cpu.parse().unwrap());
    }
    if !memory.is_empty() {
        list.insert(ResourceName::Memory, memory.parse().unwrap());
    }
    list
}

fn test_pod(name: &str, requests: ResourceList, limits: ResourceList) -> Pod {
    Pod::new(
        name,
        "default",
        vec![Container {
            name: name.to_string(),
            resources: ResourceRequirements { requests, limits },
        }],
    )
}

fn bytes(quantity: &str) -> u64 {
    quantity.parse::<Quantity>().unwrap().value() as u64
}

fn pod_ref(pod: &Pod) -> PodReference {
    PodReference {
        name: pod.name.clone(),
        namespace: pod.namespace.clone(),
        uid: String::new(),
    }
}

fn pod_memory_stats(pod: &Pod, working_set: &str) -> PodStats {
    PodStats {
        pod_ref: pod_ref(pod),
        memory: Some(MemoryStats {
            working_set_bytes: Some(bytes(working_set)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn pod_disk_stats(pod: &Pod, rootfs_used: &str, logs_used: &str, volume_used: &str) -> PodStats {
    let used = |s: &str| (!s.is_empty()).then(|| bytes(s));
    PodStats {
        pod_ref: pod_ref(pod),
        containers: vec![ContainerStats {
            name: pod.name.clone(),
            memory: None,
            rootfs: Some(FsStats {
                used_bytes: used(rootfs_used),
                ..Default::default()
            }),
            logs: Some(FsStats {
                used_bytes: used(logs_used),
                ..Default::default()
            }),
        }],
        volume_stats: vec![crate::stats::VolumeStats {
            name: "local".to_string(),
            fs: FsStats {
                used_bytes: used(volume_used),
                ..Default::default()
            },
        }],
        ..Default::default()
    }
}

fn memory_summary(node_available: &str, pod_stats: &[PodStats]) -> Summary {
    Summary {
        node: NodeStats {
            node_name: "test".to_string(),
            memory: Some(MemoryStats {
                available_bytes: Some(bytes(node_available)),
                ..Default::default()
            }),
            fs: None,
            runtime: None,
        },
        pods: pod_stats.to_vec(),
    }
}

fn disk_summary(
    nodefs_available: &str,
    imagefs_available: &str,
    pod_stats: &[PodStats],
) -> Summary {
    Summary {
        node: NodeStats {
            node_name: "test".to_string(),
            memory: None,
            fs: Some(FsStats {
                available_bytes: Some(bytes(nodefs_available)),
                ..Default::default()
            }),
            runtime: Some(RuntimeStats {
                image_fs: Some(FsStats {
                    available_bytes: Some(bytes(imagefs_available)),
                    ..Default::default()
                }),
            }),
        },
        pods: pod_stats.to_vec(),
    }
}

/// Six pods spanning the QoS tiers with their memory working sets.
fn memory_test_pods() -> (Vec<Pod>, Vec<PodStats>) {
    let specs = [
        ("best-effort-high", ("", ""), ("", ""), "500Mi"),
        ("best-effort-low", ("", ""), ("", ""), "300Mi"),
        ("burstable-high", ("100m", "100Mi"), ("200m", "1Gi"), "800Mi"),
        ("burstable-low", ("100m", "100Mi"), ("200m", "1Gi"), "300Mi"),
        ("guaranteed-high", ("100m", "1Gi"), ("100m", "1Gi"), "800Mi"),
        ("guaranteed-low", ("100m", "1Gi"), ("100m", "1Gi"), "200Mi"),
    ];
    let mut pods = Vec::new();
    let mut stats = Vec::new();
    for (name, (req_cpu, req_mem), (lim_cpu, lim_mem), working_set) in specs {
        let pod = test_pod(name, resources(req_cpu, req_mem), resources(lim_cpu, lim_mem));
        stats.push(pod_memory_stats(&pod, working_set));
        pods.push(pod);
    }
    (pods, stats)
}

/// Hard threshold at 1Gi plus a soft threshold at 2Gi with a 2 minute grace
/// period, on the given signal.
fn test_config(signal: Signal) -> Config {
    Config {
        max_pod_grace_period_seconds: 5,
        pressure_transition_period: Duration::from_secs(300),
        thresholds: vec![
            Threshold::hard(signal, "1Gi".parse().unwrap()),
            Threshold::soft(signal, "2Gi".parse().unwrap(), Duration::from_secs(120)),
        ],
    }
}

struct Fixture {
    manager: Arc<super::manager::Manager>,
    clock: Arc<FakeClock>,
    killer: Arc<MockPodKiller>,
    provider: Arc<FakeSummaryProvider>,
    recorder: Arc<FakeRecorder>,
}

fn fixture(config: Config, initial_summary: Summary) -> Fixture {
    let clock = Arc::new(FakeClock::new());
    let killer = MockPodKiller::new();
    let provider = FakeSummaryProvider::new(initial_summary);
    let recorder = Arc::new(FakeRecorder::new());

    let manager = Arc::new(
        ManagerBuilder::new(config)
            .clock(clock.clone())
            .summary_provider(provider.clone())
            .pod_killer(killer.clone())
            .recorder(recorder.clone())
            .node_ref(ObjectReference::node("test"))
            .build()
            .unwrap(),
    );

    Fixture {
        manager,
        clock,
        killer,
        provider,
        recorder,
    }
}

fn active_pods_fn(pods: Vec<Pod>) -> ActivePodsFunc {
    Arc::new(move || pods.clone())
}

const MINUTE: Duration = Duration::from_secs(60);

#[tokio::test]
async fn test_memory_pressure() {
    let (pods, pod_stats) = memory_test_pods();
    let f = fixture(
        test_config(Signal::MemoryAvailable),
        memory_summary("2Gi", &pod_stats),
    );
    let disk_info = MockDiskInfoProvider {
        dedicated_image_fs: false,
    };
    let active_pods = active_pods_fn(pods);

    let best_effort_candidate = test_pod("best-admit", resources("", ""), resources("", ""));
    let burstable_candidate = test_pod(
        "burst-admit",
        resources("100m", "100Mi"),
        resources("200m", "200Mi"),
    );

    // before any synchronize both pressure queries are false
    assert!(!f.manager.is_under_memory_pressure());
    assert!(!f.manager.is_under_disk_pressure());

    // plenty of memory available: no pressure, everything admits
    f.manager.synchronize(&disk_info, &active_pods).await;
    assert!(!f.manager.is_under_memory_pressure());
    for pod in [&best_effort_candidate, &burstable_candidate] {
        assert!(f.manager.admit(&PodAdmitAttributes { pod }).admit);
    }

    // soft threshold trips; grace period not yet spent, so no kill
    f.clock.step(MINUTE);
    f.provider.set(memory_summary("1500Mi", &pod_stats));
    f.manager.synchronize(&disk_info, &active_pods).await;
    assert!(f.manager.is_under_memory_pressure());
    assert_eq!(f.killer.count(), 0);

    // past the 2 minute grace period the soft threshold becomes actionable
    f.clock.step(3 * MINUTE);
    f.provider.set(memory_summary("1500Mi", &pod_stats));
    f.manager.synchronize(&disk_info, &active_pods).await;
    assert!(f.manager.is_under_memory_pressure());
    let (victim, status, grace) = f.killer.last().expect("a pod should have been killed");
    assert_eq!(victim.name, "best-effort-high");
    assert_eq!(status.phase, PodPhase::Failed);
    assert_eq!(status.reason, reasons::EVICTED);
    assert_eq!(grace, Some(5));
    f.killer.clear();

    // memory recovers well past the transition period
    f.clock.step(20 * MINUTE);
    f.provider.set(memory_summary("3Gi", &pod_stats));
    f.manager.synchronize(&disk_info, &active_pods).await;
    assert!(!f.manager.is_under_memory_pressure());

    // hard threshold trips: immediate eviction with no grace
    f.clock.step(MINUTE);
    f.provider.set(memory_summary("500Mi", &pod_stats));
    f.manager.synchronize(&disk_info, &active_pods).await;
    assert!(f.manager.is_under_memory_pressure());
    let (victim, _, grace) = f.killer.last().expect("a pod should have been killed");
    assert_eq!(victim.name, "best-effort-high");
    assert_eq!(grace, Some(0));

    // under memory pressure best-effort is denied, burstable admits
    let denied = f.manager.admit(&PodAdmitAttributes {
        pod: &best_effort_candidate,
    });
    assert!(!denied.admit);
    assert_eq!(denied.reason, reasons::OUT_OF_MEMORY);
    assert!(
        f.manager
            .admit(&PodAdmitAttributes {
                pod: &burstable_candidate
            })
            .admit
    );

    // signals clear but the transition period has not elapsed: pressure
    // must hold, nothing is killed, admission stays restricted
    f.clock.step(MINUTE);
    f.provider.set(memory_summary("2Gi", &pod_stats));
    f.killer.clear();
    f.manager.synchronize(&disk_info, &active_pods).await;
    assert!(f.manager.is_under_memory_pressure());
    assert_eq!(f.killer.count(), 0);
    assert!(
        !f.manager
            .admit(&PodAdmitAttributes {
                pod: &best_effort_candidate
            })
            .admit
    );
    assert!(
        f.manager
            .admit(&PodAdmitAttributes {
                pod: &burstable_candidate
            })
            .admit
    );

    // once the transition period passes the condition clears for real
    f.clock.step(5 * MINUTE);
    f.provider.set(memory_summary("2Gi", &pod_stats));
    f.killer.clear();
    f.manager.synchronize(&disk_info, &active_pods).await;
    assert!(!f.manager.is_under_memory_pressure());
    assert_eq!(f.killer.count(), 0);
    for pod in [&best_effort_candidate, &burstable_candidate] {
        assert!(f.manager.admit(&PodAdmitAttributes { pod }).admit);
    }
}

#[tokio::test]
async fn test_disk_pressure_node_fs() {
    let specs = [
        ("best-effort-high", ("", ""), ("", ""), ("500Mi", "", "")),
        ("best-effort-low", ("", ""), ("", ""), ("", "", "300Mi")),
        ("burstable-high", ("100m", "100Mi"), ("200m", "1Gi"), ("800Mi", "", "")),
        ("burstable-low", ("100m", "100Mi"), ("200m", "1Gi"), ("", "300Mi", "")),
        ("guaranteed-high", ("100m", "1Gi"), ("100m", "1Gi"), ("800Mi", "", "")),
        ("guaranteed-low", ("100m", "1Gi"), ("100m", "1Gi"), ("200Mi", "", "")),
    ];
    let mut pods = Vec::new();
    let mut pod_stats = Vec::new();
    for (name, (req_cpu, req_mem), (lim_cpu, lim_mem), (rootfs, logs, volume)) in specs {
        let pod = test_pod(name, resources(req_cpu, req_mem), resources(lim_cpu, lim_mem));
        pod_stats.push(pod_disk_stats(&pod, rootfs, logs, volume));
        pods.push(pod);
    }

    let f = fixture(
        test_config(Signal::NodeFsAvailable),
        disk_summary("16Gi", "200Gi", &pod_stats),
    );
    let disk_info = MockDiskInfoProvider {
        dedicated_image_fs: false,
    };
    let active_pods = active_pods_fn(pods);
    let candidate = test_pod("pod-to-admit", resources("", ""), resources("", ""));

    // ample disk: no pressure, candidate admits
    f.manager.synchronize(&disk_info, &active_pods).await;
    assert!(!f.manager.is_under_disk_pressure());
    assert!(f.manager.admit(&PodAdmitAttributes { pod: &candidate }).admit);

    // soft threshold trips, inside grace: pressure without a kill
    f.clock.step(MINUTE);
    f.provider.set(disk_summary("1.5Gi", "200Gi", &pod_stats));
    f.manager.synchronize(&disk_info, &active_pods).await;
    assert!(f.manager.is_under_disk_pressure());
    assert_eq!(f.killer.count(), 0);

    // grace spent: the largest best-effort disk consumer goes first
    f.clock.step(3 * MINUTE);
    f.provider.set(disk_summary("1.5Gi", "200Gi", &pod_stats));
    f.manager.synchronize(&disk_info, &active_pods).await;
    assert!(f.manager.is_under_disk_pressure());
    let (victim, _, grace) = f.killer.last().expect("a pod should have been killed");
    assert_eq!(victim.name, "best-effort-high");
    assert_eq!(grace, Some(5));
    f.killer.clear();

    // recovery clears pressure after the transition period
    f.clock.step(20 * MINUTE);
    f.provider.set(disk_summary("16Gi", "200Gi", &pod_stats));
    f.manager.synchronize(&disk_info, &active_pods).await;
    assert!(!f.manager.is_under_disk_pressure());

    // hard threshold: immediate eviction, all admissions denied
    f.clock.step(MINUTE);
    f.provider.set(disk_summary("500Mi", "200Gi", &pod_stats));
    f.manager.synchronize(&disk_info, &active_pods).await;
    assert!(f.manager.is_under_disk_pressure());
    let (victim, _, grace) = f.killer.last().expect("a pod should have been killed");
    assert_eq!(victim.name, "best-effort-high");
    assert_eq!(grace, Some(0));
    let denied = f.manager.admit(&PodAdmitAttributes { pod: &candidate });
    assert!(!denied.admit);
    assert_eq!(denied.reason, reasons::OUT_OF_DISK);

    // disk pressure denies burstable candidates too
    let burstable = test_pod(
        "burst-admit",
        resources("100m", "100Mi"),
        resources("200m", "200Mi"),
    );
    assert!(!f.manager.admit(&PodAdmitAttributes { pod: &burstable }).admit);

    // dampening: signals clear, condition and denials persist, no kill
    f.clock.step(MINUTE);
    f.provider.set(disk_summary("16Gi", "200Gi", &pod_stats));
    f.killer.clear();
    f.manager.synchronize(&disk_info, &active_pods).await;
    assert!(f.manager.is_under_disk_pressure());
    assert_eq!(f.killer.count(), 0);
    assert!(!f.manager.admit(&PodAdmitAttributes { pod: &candidate }).admit);

    // transition period elapses: pressure clears, admissions resume
    f.clock.step(5 * MINUTE);
    f.provider.set(disk_summary("16Gi", "200Gi", &pod_stats));
    f.killer.clear();
    f.manager.synchronize(&disk_info, &active_pods).await;
    assert!(!f.manager.is_under_disk_pressure());
    assert_eq!(f.killer.count(), 0);
    assert!(f.manager.admit(&PodAdmitAttributes { pod: &candidate }).admit);
}

#[tokio::test]
async fn test_image_fs_signals_redirect_without_dedicated_fs() {
    let pod = test_pod("best-effort", resources("", ""), resources("", ""));
    let pod_stats = vec![pod_disk_stats(&pod, "100Mi", "", "")];

    let config = Config {
        max_pod_grace_period_seconds: 5,
        pressure_transition_period: Duration::from_secs(300),
        thresholds: vec![Threshold::hard(
            Signal::ImageFsAvailable,
            "1Gi".parse().unwrap(),
        )],
    };
    // image fs reports 200Gi free, but the filesystems are shared and the
    // node fs is nearly full
    let f = fixture(config, disk_summary("500Mi", "200Gi", &pod_stats));
    let active_pods = active_pods_fn(vec![pod]);

    f.manager
        .synchronize(
            &MockDiskInfoProvider {
                dedicated_image_fs: false,
            },
            &active_pods,
        )
        .await;
    assert!(f.manager.is_under_disk_pressure());
    assert_eq!(f.killer.count(), 1);
}

#[tokio::test]
async fn test_dedicated_image_fs_uses_image_fs_values() {
    let pod = test_pod("best-effort", resources("", ""), resources("", ""));
    let pod_stats = vec![pod_disk_stats(&pod, "100Mi", "", "")];

    let config = Config {
        max_pod_grace_period_seconds: 5,
        pressure_transition_period: Duration::from_secs(300),
        thresholds: vec![Threshold::hard(
            Signal::ImageFsAvailable,
            "1Gi".parse().unwrap(),
        )],
    };
    // same summary, but the image fs is dedicated and has room
    let f = fixture(config, disk_summary("500Mi", "200Gi", &pod_stats));
    let active_pods = active_pods_fn(vec![pod]);

    f.manager
        .synchronize(
            &MockDiskInfoProvider {
                dedicated_image_fs: true,
            },
            &active_pods,
        )
        .await;
    assert!(!f.manager.is_under_disk_pressure());
    assert_eq!(f.killer.count(), 0);
}

#[tokio::test]
async fn test_missing_observation_preserves_grace_tracking() {
    let (pods, pod_stats) = memory_test_pods();
    let config = Config {
        max_pod_grace_period_seconds: 5,
        pressure_transition_period: Duration::from_secs(300),
        thresholds: vec![Threshold::soft(
            Signal::MemoryAvailable,
            "2Gi".parse().unwrap(),
            Duration::from_secs(120),
        )],
    };
    let f = fixture(config, memory_summary("1500Mi", &pod_stats));
    let disk_info = MockDiskInfoProvider {
        dedicated_image_fs: false,
    };
    let active_pods = active_pods_fn(pods);

    // violation starts the grace clock
    f.manager.synchronize(&disk_info, &active_pods).await;
    assert!(f.manager.is_under_memory_pressure());
    assert_eq!(f.killer.count(), 0);

    // a cycle with no memory stats must not reset the run
    f.clock.step(MINUTE);
    let mut partial = memory_summary("1500Mi", &pod_stats);
    partial.node.memory = None;
    f.provider.set(partial);
    f.manager.synchronize(&disk_info, &active_pods).await;
    assert_eq!(f.killer.count(), 0);

    // violation resumes; the original first observation makes the grace
    // period already spent
    f.clock.step(MINUTE);
    f.provider.set(memory_summary("1500Mi", &pod_stats));
    f.manager.synchronize(&disk_info, &active_pods).await;
    assert_eq!(f.killer.count(), 1);
}

#[tokio::test]
async fn test_summary_fetch_failure_preserves_state() {
    struct BrokenProvider;

    #[async_trait]
    impl SummaryProvider for BrokenProvider {
        async fn get(&self) -> Result<Summary> {
            anyhow::bail!("stats endpoint unreachable")
        }
    }

    let (pods, pod_stats) = memory_test_pods();
    let f = fixture(
        test_config(Signal::MemoryAvailable),
        memory_summary("500Mi", &pod_stats),
    );
    let disk_info = MockDiskInfoProvider {
        dedicated_image_fs: false,
    };
    let active_pods = active_pods_fn(pods);

    // establish pressure
    f.manager.synchronize(&disk_info, &active_pods).await;
    assert!(f.manager.is_under_memory_pressure());
    f.killer.clear();

    // a broken fetch skips the cycle: pressure stands, nothing is killed
    let broken = ManagerBuilder::new(test_config(Signal::MemoryAvailable))
        .clock(f.clock.clone())
        .summary_provider(Arc::new(BrokenProvider))
        .pod_killer(f.killer.clone())
        .recorder(Arc::new(FakeRecorder::new()))
        .node_ref(ObjectReference::node("test"))
        .build()
        .unwrap();
    broken.synchronize(&disk_info, &active_pods).await;
    assert_eq!(f.killer.count(), 0);
    assert!(!broken.is_under_memory_pressure());
    assert!(f.manager.is_under_memory_pressure());
}

#[tokio::test]
async fn test_at_most_one_eviction_per_cycle() {
    let (pods, mut pod_stats) = memory_test_pods();
    for (pod, stats) in pods.iter().zip(pod_stats.iter_mut()) {
        stats.containers = pod_disk_stats(pod, "100Mi", "", "").containers;
    }

    // both memory and disk hard thresholds violated in the same cycle
    let config = Config {
        max_pod_grace_period_seconds: 5,
        pressure_transition_period: Duration::from_secs(300),
        thresholds: vec![
            Threshold::hard(Signal::MemoryAvailable, "1Gi".parse().unwrap()),
            Threshold::hard(Signal::NodeFsAvailable, "1Gi".parse().unwrap()),
        ],
    };
    let mut summary = memory_summary("500Mi", &pod_stats);
    summary.node.fs = Some(FsStats {
        available_bytes: Some(bytes("500Mi")),
        ..Default::default()
    });

    let f = fixture(config, summary);
    let active_pods = active_pods_fn(pods);
    f.manager
        .synchronize(
            &MockDiskInfoProvider {
                dedicated_image_fs: false,
            },
            &active_pods,
        )
        .await;

    assert!(f.manager.is_under_memory_pressure());
    assert!(f.manager.is_under_disk_pressure());
    assert_eq!(f.killer.count(), 1);
}

#[tokio::test]
async fn test_hard_threshold_preferred_over_actionable_soft() {
    let (pods, pod_stats) = memory_test_pods();
    let f = fixture(
        test_config(Signal::MemoryAvailable),
        memory_summary("1500Mi", &pod_stats),
    );
    let disk_info = MockDiskInfoProvider {
        dedicated_image_fs: false,
    };
    let active_pods = active_pods_fn(pods);

    // let the soft threshold accumulate past its grace period
    f.manager.synchronize(&disk_info, &active_pods).await;
    f.clock.step(3 * MINUTE);
    f.provider.set(memory_summary("1500Mi", &pod_stats));
    f.manager.synchronize(&disk_info, &active_pods).await;
    let (_, _, grace) = f.killer.last().unwrap();
    assert_eq!(grace, Some(5));
    f.killer.clear();

    // now the hard threshold is violated too; it wins and the kill is
    // immediate even though the soft threshold has been violated longer
    f.clock.step(MINUTE);
    f.provider.set(memory_summary("500Mi", &pod_stats));
    f.manager.synchronize(&disk_info, &active_pods).await;
    let (_, _, grace) = f.killer.last().unwrap();
    assert_eq!(grace, Some(0));
}

#[tokio::test]
async fn test_kill_failure_is_recorded_and_retried_next_cycle() {
    let (pods, pod_stats) = memory_test_pods();
    let clock = Arc::new(FakeClock::new());
    let killer = FailingPodKiller::new();
    let provider = FakeSummaryProvider::new(memory_summary("500Mi", &pod_stats));
    let recorder = Arc::new(FakeRecorder::new());

    let manager = ManagerBuilder::new(test_config(Signal::MemoryAvailable))
        .clock(clock.clone())
        .summary_provider(provider.clone())
        .pod_killer(killer.clone())
        .recorder(recorder.clone())
        .node_ref(ObjectReference::node("test"))
        .build()
        .unwrap();
    let disk_info = MockDiskInfoProvider {
        dedicated_image_fs: false,
    };
    let active_pods = active_pods_fn(pods);

    manager.synchronize(&disk_info, &active_pods).await;
    assert_eq!(killer.attempts(), 1);
    let events = recorder.events();
    assert!(events
        .iter()
        .any(|e| e.reason == reasons::EVICTED && e.object.kind == "Pod"));

    // the next cycle re-selects and tries again
    clock.step(MINUTE);
    manager.synchronize(&disk_info, &active_pods).await;
    assert_eq!(killer.attempts(), 2);
}

#[tokio::test]
async fn test_no_active_pods_records_event_without_kill() {
    let (_, pod_stats) = memory_test_pods();
    let f = fixture(
        test_config(Signal::MemoryAvailable),
        memory_summary("500Mi", &pod_stats),
    );
    let active_pods = active_pods_fn(vec![]);

    f.manager
        .synchronize(
            &MockDiskInfoProvider {
                dedicated_image_fs: false,
            },
            &active_pods,
        )
        .await;

    assert_eq!(f.killer.count(), 0);
    let events = f.recorder.events();
    assert!(events
        .iter()
        .any(|e| e.reason == reasons::EVICTION_THRESHOLD_MET
            && e.message.contains("No eviction candidates")));
}

#[tokio::test]
async fn test_eviction_event_emitted_on_threshold_met() {
    let (pods, pod_stats) = memory_test_pods();
    let f = fixture(
        test_config(Signal::MemoryAvailable),
        memory_summary("500Mi", &pod_stats),
    );
    let active_pods = active_pods_fn(pods);

    f.manager
        .synchronize(
            &MockDiskInfoProvider {
                dedicated_image_fs: false,
            },
            &active_pods,
        )
        .await;

    let events = f.recorder.events();
    assert!(events.iter().any(|e| {
        e.reason == reasons::EVICTION_THRESHOLD_MET
            && e.object.kind == "Node"
            && e.message.contains("memory")
    }));
}

#[tokio::test]
async fn test_builder_rejects_invalid_config() {
    let negative_grace = Config {
        max_pod_grace_period_seconds: -1,
        pressure_transition_period: Duration::from_secs(300),
        thresholds: vec![],
    };
    assert!(ManagerBuilder::new(negative_grace)
        .clock(Arc::new(FakeClock::new()))
        .summary_provider(FakeSummaryProvider::new(Summary::default()))
        .pod_killer(MockPodKiller::new())
        .recorder(Arc::new(FakeRecorder::new()))
        .node_ref(ObjectReference::node("test"))
        .build()
        .is_err());

    let duplicate = Config {
        max_pod_grace_period_seconds: 5,
        pressure_transition_period: Duration::from_secs(300),
        thresholds: vec![
            Threshold::hard(Signal::MemoryAvailable, "1Gi".parse().unwrap()),
            Threshold::hard(Signal::MemoryAvailable, "2Gi".parse().unwrap()),
        ],
    };
    assert!(ManagerBuilder::new(duplicate)
        .clock(Arc::new(FakeClock::new()))
        .summary_provider(FakeSummaryProvider::new(Summary::default()))
        .pod_killer(MockPodKiller::new())
        .recorder(Arc::new(FakeRecorder::new()))
        .node_ref(ObjectReference::node("test"))
        .build()
        .is_err());
}
