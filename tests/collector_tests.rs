mod common;

use common::*;
use hoststat::{
    CollectContext, CollectionError, Collector, CollectorState, CpuReading, DiskPathEntry, MetricKind,
    MetricSource, Reading, SourceTable, StatusError, Temperature,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

const SECOND: Duration = Duration::from_secs(1);

fn disk_paths(snapshot: &hoststat::Snapshot) -> Vec<String> {
    snapshot.disks.iter().map(|d| d.path.clone()).collect()
}

fn path_string(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}

#[tokio::test(start_paused = true)]
async fn healthy_sources_give_a_complete_snapshot() {
    let root = tempdir().unwrap();
    let dirs = make_dirs(root.path(), &["a", "b"]);
    let config = config_for(&[&dirs[0], &dirs[1]]);
    let collector = Collector::new(&config, healthy_sources(SECOND, MockDisks::new()));

    assert_eq!(collector.state(), CollectorState::Idle);
    let snapshot = collector.collect().await.unwrap();

    assert!(snapshot.is_complete());
    assert!(!snapshot.timed_out);
    assert_eq!(snapshot.uptime, Some(Duration::from_secs(15 * 86_400 + 8 * 3_600 + 22 * 60)));
    assert_eq!(snapshot.cpu.as_ref().map(|c| c.percent), Some(12.5));
    assert_eq!(snapshot.memory.as_ref().map(|m| m.total), Some(16 * GB));
    assert_eq!(snapshot.network.as_ref().map(|n| n.bytes_sent), Some(120 * GB));
    assert_eq!(snapshot.processes.map(|p| p.total), Some(212));
    assert_eq!(disk_paths(&snapshot), vec![path_string(&dirs[0]), path_string(&dirs[1])]);
    assert_eq!(collector.state(), CollectorState::Completed);
}

#[tokio::test(start_paused = true)]
async fn stuck_disk_is_reported_and_siblings_survive() {
    let root = tempdir().unwrap();
    let dirs = make_dirs(root.path(), &["first", "stuck", "third"]);
    let disks = MockDisks::new().with(
        &dirs[1],
        DiskBehaviour::Ok { latency: Duration::from_secs(600), total: 10 * GB, used: GB },
    );
    let config = config_for(&[&dirs[0], &dirs[1], &dirs[2]]);
    let collector = Collector::new(&config, healthy_sources(SECOND, disks));

    let started = tokio::time::Instant::now();
    let snapshot = collector.collect().await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(25), "returned before the deadline: {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(26), "overran the deadline: {:?}", elapsed);
    assert!(snapshot.timed_out);
    assert_eq!(collector.state(), CollectorState::TimedOut);

    assert_eq!(disk_paths(&snapshot), vec![path_string(&dirs[0]), path_string(&dirs[2])]);
    assert_eq!(snapshot.partial_failures.len(), 1);
    let failure = snapshot.disk_failure(1).expect("stuck disk should be recorded");
    assert_eq!(failure.kind, MetricKind::Disk);
    assert_eq!(failure.disk_path.as_deref(), Some(path_string(&dirs[1]).as_str()));

    assert!(snapshot.cpu.is_some());
    assert!(snapshot.memory.is_some());
    assert!(snapshot.network.is_some());
    assert!(snapshot.uptime.is_some());
}

#[tokio::test(start_paused = true)]
async fn disk_order_follows_configuration_not_completion() {
    let root = tempdir().unwrap();
    let dirs = make_dirs(root.path(), &["slow", "fast", "medium"]);
    let disks = MockDisks::new()
        .with(&dirs[0], DiskBehaviour::Ok { latency: 3 * SECOND, total: 10 * GB, used: GB })
        .with(&dirs[1], DiskBehaviour::Ok { latency: SECOND, total: 10 * GB, used: 2 * GB })
        .with(&dirs[2], DiskBehaviour::Ok { latency: 2 * SECOND, total: 10 * GB, used: 3 * GB });
    let config = config_for(&[&dirs[0], &dirs[1], &dirs[2]]);
    let collector = Collector::new(&config, healthy_sources(SECOND, disks));

    let snapshot = collector.collect().await.unwrap();

    assert_eq!(
        disk_paths(&snapshot),
        dirs.iter().map(|d| path_string(d)).collect::<Vec<_>>()
    );
    let used: Vec<u64> = snapshot.disks.iter().map(|d| d.used).collect();
    assert_eq!(used, vec![GB, 2 * GB, 3 * GB]);
}

#[tokio::test(start_paused = true)]
async fn failing_source_does_not_abort_the_others() {
    let root = tempdir().unwrap();
    let dirs = make_dirs(root.path(), &["ok", "broken"]);
    let disks = MockDisks::new().with(&dirs[1], DiskBehaviour::Fail { latency: SECOND });
    let sources = healthy_sources(SECOND, disks)
        .register(Arc::new(FixedSource::failing(MetricKind::Memory, Duration::ZERO)));
    let config = config_for(&[&dirs[0], &dirs[1]]);
    let collector = Collector::new(&config, sources);

    let snapshot = collector.collect().await.unwrap();

    assert!(!snapshot.timed_out);
    assert_eq!(collector.state(), CollectorState::Completed);
    assert!(snapshot.memory.is_none());
    assert!(snapshot.is_failed(MetricKind::Memory));
    assert!(snapshot.is_failed(MetricKind::Disk));
    assert!(snapshot.disk_failure(1).is_some());
    assert_eq!(disk_paths(&snapshot), vec![path_string(&dirs[0])]);
    assert!(snapshot.cpu.is_some() && snapshot.network.is_some() && snapshot.uptime.is_some());
}

#[tokio::test(start_paused = true)]
async fn no_successful_source_is_a_collection_failure() {
    let root = tempdir().unwrap();
    let dirs = make_dirs(root.path(), &["a"]);
    let collector = Collector::new(&config_for(&[&dirs[0]]), failing_sources(SECOND, &dirs[0]));

    let err = collector.collect().await.unwrap_err();
    assert!(matches!(err, StatusError::CollectionFailed(_)));
}

#[tokio::test(start_paused = true)]
async fn every_source_past_the_deadline_is_a_collection_failure() {
    let root = tempdir().unwrap();
    let dirs = make_dirs(root.path(), &["a"]);
    let slow = Duration::from_secs(300);
    let disks = MockDisks::new().with(&dirs[0], DiskBehaviour::Ok { latency: slow, total: GB, used: 0 });
    let collector = Collector::new(&config_for(&[&dirs[0]]), healthy_sources(slow, disks));

    let err = collector.collect().await.unwrap_err();
    assert!(matches!(err, StatusError::CollectionFailed(_)));
    assert_eq!(collector.state(), CollectorState::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn no_resolvable_disk_is_a_collection_failure() {
    let config = hoststat::StatusConfig {
        disk_paths: vec![
            DiskPathEntry::from("relative/path"),
            DiskPathEntry::from("/definitely/not/a/real/mount/point"),
        ],
        auto_discover_disks: false,
        ..hoststat::StatusConfig::default()
    };
    let collector = Collector::new(&config, healthy_sources(SECOND, MockDisks::new()));

    let err = collector.collect().await.unwrap_err();
    assert!(matches!(err, StatusError::CollectionFailed(_)));
}

#[tokio::test(start_paused = true)]
async fn skipped_entries_are_carried_as_warnings() {
    let root = tempdir().unwrap();
    let dirs = make_dirs(root.path(), &["a"]);
    let config = hoststat::StatusConfig {
        disk_paths: vec![
            DiskPathEntry::Path(path_string(&dirs[0])),
            DiskPathEntry::from("relative/path"),
            DiskPathEntry::Path(format!("{}/", path_string(&dirs[0]))),
        ],
        auto_discover_disks: false,
        ..hoststat::StatusConfig::default()
    };
    let collector = Collector::new(&config, healthy_sources(SECOND, MockDisks::new()));

    let snapshot = collector.collect().await.unwrap();

    assert_eq!(snapshot.disks.len(), 1);
    assert_eq!(snapshot.warnings.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn out_of_range_reading_fails_only_its_own_category() {
    let root = tempdir().unwrap();
    let dirs = make_dirs(root.path(), &["a"]);
    let nan_cpu = Reading::Cpu(CpuReading {
        percent: f32::NAN,
        temperature: Temperature::Disabled,
        cores: 4,
        load_average: None,
        frequency_mhz: None,
    });
    let sources = healthy_sources(SECOND, MockDisks::new()).register(Arc::new(FixedSource::ok(nan_cpu, SECOND)));
    let collector = Collector::new(&config_for(&[&dirs[0]]), sources);

    let snapshot = collector.collect().await.unwrap();

    assert!(snapshot.cpu.is_none());
    assert_eq!(snapshot.failed_kinds().into_iter().collect::<Vec<_>>(), vec![MetricKind::Cpu]);
    assert!(snapshot.partial_failures[0].reason.contains("rejected"), "{:?}", snapshot.partial_failures);
    assert!(snapshot.memory.is_some() && snapshot.network.is_some() && snapshot.processes.is_some());
    assert_eq!(snapshot.disks.len(), 1);
}

/// Reports whether the collector told it the host is containerized.
struct ContainerFlagEcho;

#[async_trait]
impl MetricSource for ContainerFlagEcho {
    fn kind(&self) -> MetricKind {
        MetricKind::Uptime
    }

    async fn collect(&self, ctx: &CollectContext) -> Result<Reading, CollectionError> {
        Ok(Reading::Uptime(Duration::from_secs(u64::from(ctx.containerized))))
    }
}

#[tokio::test(start_paused = true)]
async fn sources_see_the_collector_container_flag() {
    let root = tempdir().unwrap();
    let dirs = make_dirs(root.path(), &["a"]);
    let sources = healthy_sources(SECOND, MockDisks::new()).register(Arc::new(ContainerFlagEcho));
    let collector = Collector::new(&config_for(&[&dirs[0]]), sources);

    let snapshot = collector.collect().await.unwrap();

    let seen = snapshot.uptime.map(|u| u.as_secs() == 1);
    assert_eq!(seen, Some(snapshot.containerized));
}

struct PanickingSource;

#[async_trait]
impl MetricSource for PanickingSource {
    fn kind(&self) -> MetricKind {
        MetricKind::Network
    }

    async fn collect(&self, _ctx: &CollectContext) -> Result<Reading, CollectionError> {
        panic!("driver exploded");
    }
}

/// Registered as CPU but answers with a memory reading.
struct MislabelledSource;

#[async_trait]
impl MetricSource for MislabelledSource {
    fn kind(&self) -> MetricKind {
        MetricKind::Cpu
    }

    async fn collect(&self, _ctx: &CollectContext) -> Result<Reading, CollectionError> {
        Ok(memory_reading())
    }
}

#[tokio::test(start_paused = true)]
async fn misbehaving_sources_become_partial_failures() {
    let root = tempdir().unwrap();
    let dirs = make_dirs(root.path(), &["a"]);
    let sources = healthy_sources(SECOND, MockDisks::new())
        .register(Arc::new(PanickingSource))
        .register(Arc::new(MislabelledSource));
    let collector = Collector::new(&config_for(&[&dirs[0]]), sources);

    let snapshot = collector.collect().await.unwrap();

    assert!(snapshot.network.is_none());
    assert!(snapshot.cpu.is_none());
    assert!(snapshot.is_failed(MetricKind::Network));
    assert!(snapshot.is_failed(MetricKind::Cpu));
    assert!(snapshot.memory.is_some());
    assert_eq!(snapshot.disks.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn missing_source_is_reported_not_fatal() {
    let root = tempdir().unwrap();
    let dirs = make_dirs(root.path(), &["a"]);
    let sources = SourceTable::new()
        .register(Arc::new(FixedSource::ok(cpu_reading(), SECOND)))
        .register(Arc::new(MockDisks::new()));
    let collector = Collector::new(&config_for(&[&dirs[0]]), sources);

    let snapshot = collector.collect().await.unwrap();

    assert!(snapshot.cpu.is_some());
    assert_eq!(snapshot.disks.len(), 1);
    for kind in [MetricKind::Uptime, MetricKind::Memory, MetricKind::Network, MetricKind::Processes] {
        assert!(snapshot.is_failed(kind), "{} should be failed", kind);
    }
}

#[tokio::test(start_paused = true)]
async fn identical_inputs_give_identical_snapshots() {
    let root = tempdir().unwrap();
    let dirs = make_dirs(root.path(), &["a", "b", "c"]);
    let build = || {
        let disks = MockDisks::new()
            .with(&dirs[0], DiskBehaviour::Ok { latency: 2 * SECOND, total: 10 * GB, used: 4 * GB })
            .with(&dirs[1], DiskBehaviour::Fail { latency: SECOND })
            .with(&dirs[2], DiskBehaviour::Ok { latency: SECOND, total: 20 * GB, used: 5 * GB });
        Collector::new(&config_for(&[&dirs[0], &dirs[1], &dirs[2]]), healthy_sources(SECOND, disks))
    };

    let first = build().collect().await.unwrap();
    let second = build().collect().await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(disk_paths(&first), disk_paths(&second));
    assert_eq!(first.disks.iter().map(|d| d.used).collect::<Vec<_>>(), second.disks.iter().map(|d| d.used).collect::<Vec<_>>());
    assert_eq!(first.failed_kinds(), second.failed_kinds());
    assert_eq!(first.partial_failures.len(), second.partial_failures.len());
    assert_eq!(first.timed_out, second.timed_out);
}

#[tokio::test(start_paused = true)]
async fn bounded_worker_pool_still_finishes_every_task() {
    let root = tempdir().unwrap();
    let names: Vec<String> = (0..6).map(|i| format!("d{}", i)).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let dirs = make_dirs(root.path(), &name_refs);
    let paths: Vec<&std::path::Path> = dirs.iter().map(|d| d.as_path()).collect();
    let config = hoststat::StatusConfig { max_workers: 1, ..config_for(&paths) };
    let collector = Collector::new(&config, healthy_sources(SECOND, MockDisks::new()));

    let started = tokio::time::Instant::now();
    let snapshot = collector.collect().await.unwrap();

    // Eleven one-second tasks through a single worker.
    assert!(started.elapsed() >= Duration::from_secs(11));
    assert!(snapshot.is_complete());
    assert_eq!(snapshot.disks.len(), 6);
}
