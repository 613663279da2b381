use async_trait::async_trait;
use log::{debug, warn};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use sysinfo::{Components, Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};

use crate::features::system_metrics::models::{CpuReading, MemoryReading, ProcessReading, Temperature};
use crate::shared::error::CollectionError;
use crate::shared::traits::{run_blocking, CollectContext, MetricKind, MetricSource, Reading};

/// Sensor labels that report package or core temperature.
const CPU_SENSOR_LABELS: [&str; 7] = [
    "coretemp", "k10temp", "cpu_thermal", "acpitz", "zenpower", "package id", "tctl",
];

#[derive(Debug, Default)]
pub struct CpuSource;

impl CpuSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricSource for CpuSource {
    fn kind(&self) -> MetricKind {
        MetricKind::Cpu
    }

    async fn collect(&self, ctx: &CollectContext) -> Result<Reading, CollectionError> {
        let show_temp = ctx.show_temp;
        run_blocking(MetricKind::Cpu, ctx, move || collect_cpu(show_temp))
            .await
            .map(Reading::Cpu)
    }
}

fn collect_cpu(show_temp: bool) -> Result<CpuReading, CollectionError> {
    let mut sys = System::new();
    sys.refresh_cpu_usage();
    // Usage is a delta between two refreshes.
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_usage();
    sys.refresh_cpu_frequency();

    if sys.cpus().is_empty() {
        return Err(CollectionError::unavailable(MetricKind::Cpu, "no CPU information available"));
    }

    let percent = sys.global_cpu_usage();
    if !percent.is_finite() {
        return Err(CollectionError::system_api(
            MetricKind::Cpu,
            format!("usage sample is not a number: {}", percent),
        ));
    }
    let frequency_mhz = sys.cpus().first().map(|cpu| cpu.frequency()).filter(|mhz| *mhz > 0);

    let load_average = if cfg!(unix) {
        let load = System::load_average();
        Some((load.one, load.five, load.fifteen))
    } else {
        None
    };

    let temperature = if show_temp { cpu_temperature() } else { Temperature::Disabled };

    Ok(CpuReading {
        percent: percent.clamp(0.0, 100.0),
        temperature,
        cores: sys.cpus().len(),
        load_average,
        frequency_mhz,
    })
}

/// Averages every CPU sensor that reports a value. Never fails.
fn cpu_temperature() -> Temperature {
    let components = Components::new_with_refreshed_list();
    let readings: Vec<f32> = components
        .list()
        .iter()
        .filter(|c| {
            let label = c.label().to_ascii_lowercase();
            CPU_SENSOR_LABELS.iter().any(|key| label.contains(key))
        })
        .filter_map(|c| c.temperature())
        .filter(|t| t.is_finite() && *t > 0.0)
        .collect();

    if readings.is_empty() {
        debug!("No CPU temperature sensor found");
        Temperature::Unavailable
    } else {
        Temperature::Celsius(readings.iter().sum::<f32>() / readings.len() as f32)
    }
}

#[derive(Debug, Default)]
pub struct MemorySource;

impl MemorySource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricSource for MemorySource {
    fn kind(&self) -> MetricKind {
        MetricKind::Memory
    }

    async fn collect(&self, ctx: &CollectContext) -> Result<Reading, CollectionError> {
        run_blocking(MetricKind::Memory, ctx, || {
            let mut sys = System::new();
            sys.refresh_memory();
            if sys.total_memory() == 0 {
                return Err(CollectionError::unavailable(MetricKind::Memory, "total memory reported as zero"));
            }
            Ok(MemoryReading::new(
                sys.total_memory(),
                sys.used_memory(),
                sys.total_swap(),
                sys.used_swap(),
            ))
        })
        .await
        .map(Reading::Memory)
    }
}

/// Host uptime, or container uptime when `ctx.containerized` is set.
#[derive(Debug, Default)]
pub struct UptimeSource;

impl UptimeSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricSource for UptimeSource {
    fn kind(&self) -> MetricKind {
        MetricKind::Uptime
    }

    async fn collect(&self, ctx: &CollectContext) -> Result<Reading, CollectionError> {
        let containerized = ctx.containerized;
        run_blocking(MetricKind::Uptime, ctx, move || {
            if containerized {
                match container_uptime() {
                    Some(uptime) => return Ok(uptime),
                    None => warn!("Could not read container start time, using host uptime"),
                }
            }
            match System::uptime() {
                0 => Err(CollectionError::unavailable(MetricKind::Uptime, "uptime reported as zero")),
                secs => Ok(Duration::from_secs(secs)),
            }
        })
        .await
        .map(Reading::Uptime)
    }
}

#[derive(Debug, Default)]
pub struct ProcessSource;

impl ProcessSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricSource for ProcessSource {
    fn kind(&self) -> MetricKind {
        MetricKind::Processes
    }

    async fn collect(&self, ctx: &CollectContext) -> Result<Reading, CollectionError> {
        run_blocking(MetricKind::Processes, ctx, || {
            let mut sys = System::new();
            sys.refresh_processes_specifics(ProcessesToUpdate::All, true, ProcessRefreshKind::nothing());
            if sys.processes().is_empty() {
                return Err(CollectionError::unavailable(MetricKind::Processes, "process table is empty"));
            }
            Ok(count_processes(sys.processes().values().map(|p| p.status())))
        })
        .await
        .map(Reading::Processes)
    }
}

fn count_processes(statuses: impl Iterator<Item = ProcessStatus>) -> ProcessReading {
    let mut reading = ProcessReading::default();
    for status in statuses {
        reading.total += 1;
        match status {
            ProcessStatus::Run => reading.running += 1,
            ProcessStatus::Sleep => reading.sleeping += 1,
            ProcessStatus::Idle => reading.idle += 1,
            ProcessStatus::Stop => reading.stopped += 1,
            ProcessStatus::Zombie => reading.zombie += 1,
            _ => {}
        }
    }
    debug!("Counted {} processes ({} running)", reading.total, reading.running);
    reading
}

/// Time since PID 1 started.
fn container_uptime() -> Option<Duration> {
    let pid = Pid::from_u32(1);
    let mut sys = System::new();
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        false,
        ProcessRefreshKind::nothing(),
    );
    let started = sys.process(pid)?.start_time();
    let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
    now.checked_sub(started).map(Duration::from_secs)
}

pub fn is_containerized() -> bool {
    if Path::new("/.dockerenv").exists() || Path::new("/run/.containerenv").exists() {
        return true;
    }
    if cfg!(unix) {
        for cgroup in ["/proc/1/cgroup", "/proc/self/cgroup"] {
            if let Ok(content) = fs::read_to_string(cgroup) {
                if ["docker", "kubepods", "containerd", "lxc"].iter().any(|k| content.contains(k)) {
                    return true;
                }
            }
        }
    }
    std::env::var_os("KUBERNETES_SERVICE_HOST").is_some()
}
