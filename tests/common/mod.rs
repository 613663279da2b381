#![allow(dead_code)]

use async_trait::async_trait;
use hoststat::{
    CollectContext, CollectionError, CpuReading, DiskPathEntry, DiskReading, MemoryReading, MetricKind,
    MetricSource, NetworkReading, ProcessReading, Reading, SourceTable, StatusConfig, Temperature,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const GB: u64 = 1024 * 1024 * 1024;

/// Sleeps for a fixed latency, then returns a fixed outcome.
pub struct FixedSource {
    kind: MetricKind,
    latency: Duration,
    reading: Option<Reading>,
    calls: Arc<AtomicUsize>,
}

impl FixedSource {
    pub fn ok(reading: Reading, latency: Duration) -> Self {
        Self { kind: reading.kind(), latency, reading: Some(reading), calls: Arc::default() }
    }

    pub fn failing(kind: MetricKind, latency: Duration) -> Self {
        Self { kind, latency, reading: None, calls: Arc::default() }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl MetricSource for FixedSource {
    fn kind(&self) -> MetricKind {
        self.kind
    }

    async fn collect(&self, ctx: &CollectContext) -> Result<Reading, CollectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(CollectionError::Cancelled(self.kind)),
            _ = tokio::time::sleep(self.latency) => {}
        }
        self.reading
            .clone()
            .ok_or_else(|| CollectionError::unavailable(self.kind, "mock failure"))
    }
}

#[derive(Clone, Copy)]
pub enum DiskBehaviour {
    Ok { latency: Duration, total: u64, used: u64 },
    Fail { latency: Duration },
}

/// Disk source whose behaviour is chosen per configured path.
#[derive(Default)]
pub struct MockDisks {
    behaviours: HashMap<String, DiskBehaviour>,
}

impl MockDisks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &Path, behaviour: DiskBehaviour) -> Self {
        self.behaviours.insert(path.to_string_lossy().into_owned(), behaviour);
        self
    }
}

#[async_trait]
impl MetricSource for MockDisks {
    fn kind(&self) -> MetricKind {
        MetricKind::Disk
    }

    async fn collect(&self, ctx: &CollectContext) -> Result<Reading, CollectionError> {
        let target = ctx.target.clone().expect("disk task without target");
        let behaviour = self
            .behaviours
            .get(&target.path)
            .copied()
            .unwrap_or(DiskBehaviour::Ok { latency: Duration::from_secs(1), total: 100 * GB, used: 50 * GB });
        let latency = match behaviour {
            DiskBehaviour::Ok { latency, .. } | DiskBehaviour::Fail { latency } => latency,
        };
        tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(CollectionError::Cancelled(MetricKind::Disk)),
            _ = tokio::time::sleep(latency) => {}
        }
        match behaviour {
            DiskBehaviour::Ok { total, used, .. } => Ok(Reading::Disk(DiskReading::new(&target, total, used))),
            DiskBehaviour::Fail { .. } => Err(CollectionError::unavailable(MetricKind::Disk, "mock disk failure")),
        }
    }
}

pub fn cpu_reading() -> Reading {
    Reading::Cpu(CpuReading {
        percent: 12.5,
        temperature: Temperature::Celsius(48.0),
        cores: 8,
        load_average: Some((0.5, 0.4, 0.3)),
        frequency_mhz: Some(2400),
    })
}

pub fn memory_reading() -> Reading {
    Reading::Memory(MemoryReading::new(16 * GB, 6 * GB, 0, 0))
}

pub fn network_reading() -> Reading {
    Reading::Network(NetworkReading { bytes_sent: 120 * GB, bytes_recv: 1280 * GB })
}

pub fn process_reading() -> Reading {
    Reading::Processes(ProcessReading { total: 212, running: 3, sleeping: 201, idle: 6, stopped: 0, zombie: 2 })
}

pub fn uptime_reading() -> Reading {
    Reading::Uptime(Duration::from_secs(15 * 86_400 + 8 * 3_600 + 22 * 60))
}

/// Every non-disk source succeeds after `latency`.
pub fn healthy_sources(latency: Duration, disks: MockDisks) -> SourceTable {
    SourceTable::new()
        .register(Arc::new(FixedSource::ok(uptime_reading(), latency)))
        .register(Arc::new(FixedSource::ok(cpu_reading(), latency)))
        .register(Arc::new(FixedSource::ok(memory_reading(), latency)))
        .register(Arc::new(FixedSource::ok(network_reading(), latency)))
        .register(Arc::new(FixedSource::ok(process_reading(), latency)))
        .register(Arc::new(disks))
}

/// Every source, including every disk at `disk_path`, fails after `latency`.
pub fn failing_sources(latency: Duration, disk_path: &Path) -> SourceTable {
    let mut table = SourceTable::new();
    for kind in [
        MetricKind::Uptime,
        MetricKind::Cpu,
        MetricKind::Memory,
        MetricKind::Network,
        MetricKind::Processes,
    ] {
        table = table.register(Arc::new(FixedSource::failing(kind, latency)));
    }
    table.register(Arc::new(MockDisks::new().with(disk_path, DiskBehaviour::Fail { latency })))
}

pub fn config_for(paths: &[&Path]) -> StatusConfig {
    StatusConfig {
        disk_paths: paths
            .iter()
            .map(|p| DiskPathEntry::Path(p.to_string_lossy().into_owned()))
            .collect(),
        auto_discover_disks: false,
        max_workers: 8,
        ..StatusConfig::default()
    }
}

pub fn make_dirs(root: &Path, names: &[&str]) -> Vec<std::path::PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = root.join(name);
            std::fs::create_dir(&path).unwrap();
            path
        })
        .collect()
}
