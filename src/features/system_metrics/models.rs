use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::features::filesystem::{percentage, DiskReading};
use crate::features::network::NetworkReading;
use crate::shared::traits::{MetricKind, Validatable};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "celsius", rename_all = "lowercase")]
pub enum Temperature {
    /// Not requested (`show_temp` is off).
    Disabled,
    /// Requested, but no usable sensor was found.
    Unavailable,
    Celsius(f32),
}

impl Temperature {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Celsius(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuReading {
    pub percent: f32,
    pub temperature: Temperature,
    pub cores: usize,
    pub load_average: Option<(f64, f64, f64)>,
    /// Current clock of the first core, when the platform reports one.
    pub frequency_mhz: Option<u64>,
}

impl Validatable for CpuReading {
    fn validate(&self) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.percent) {
            return Err(format!("CPU usage {} is not between 0 and 100", self.percent));
        }
        if let Temperature::Celsius(t) = self.temperature {
            if !t.is_finite() {
                return Err("CPU temperature is not a number".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryReading {
    pub total: u64,
    pub used: u64,
    pub percent: f64,
    pub swap_total: u64,
    pub swap_used: u64,
}

impl MemoryReading {
    pub fn new(total: u64, used: u64, swap_total: u64, swap_used: u64) -> Self {
        let used = used.min(total);
        Self {
            total,
            used,
            percent: percentage(used, total),
            swap_total,
            swap_used: swap_used.min(swap_total),
        }
    }

    pub fn swap_percent(&self) -> f64 {
        percentage(self.swap_used, self.swap_total)
    }
}

impl Validatable for MemoryReading {
    fn validate(&self) -> Result<(), String> {
        if self.used > self.total {
            return Err("Used memory cannot exceed total memory".to_string());
        }
        if self.swap_used > self.swap_total {
            return Err("Used swap cannot exceed total swap".to_string());
        }
        if !(0.0..=100.0).contains(&self.percent) {
            return Err(format!("Memory usage {} is not between 0 and 100", self.percent));
        }
        Ok(())
    }
}

/// Process counts by scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProcessReading {
    pub total: usize,
    pub running: usize,
    pub sleeping: usize,
    pub idle: usize,
    pub stopped: usize,
    pub zombie: usize,
}

impl Validatable for ProcessReading {
    fn validate(&self) -> Result<(), String> {
        let counted = self.running + self.sleeping + self.idle + self.stopped + self.zombie;
        if counted > self.total {
            return Err(format!("{} processes counted by state but only {} in total", counted, self.total));
        }
        Ok(())
    }
}

/// A category (or a single disk) missing from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialFailure {
    pub kind: MetricKind,
    /// Position of the disk in resolver order, for disk failures.
    pub disk_index: Option<usize>,
    pub disk_path: Option<String>,
    pub reason: String,
}

impl PartialFailure {
    pub fn metric(kind: MetricKind, reason: impl Into<String>) -> Self {
        Self { kind, disk_index: None, disk_path: None, reason: reason.into() }
    }

    pub fn disk(index: usize, path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: MetricKind::Disk,
            disk_index: Some(index),
            disk_path: Some(path.into()),
            reason: reason.into(),
        }
    }
}

/// All readings from one collection cycle. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub hostname: String,
    pub collected_at: DateTime<Utc>,
    pub containerized: bool,
    pub uptime: Option<Duration>,
    pub cpu: Option<CpuReading>,
    pub memory: Option<MemoryReading>,
    pub disks: Vec<DiskReading>,
    pub network: Option<NetworkReading>,
    pub processes: Option<ProcessReading>,
    pub partial_failures: Vec<PartialFailure>,
    pub timed_out: bool,
    pub warnings: Vec<String>,
}

impl Snapshot {
    pub fn failed_kinds(&self) -> BTreeSet<MetricKind> {
        self.partial_failures.iter().map(|f| f.kind).collect()
    }

    pub fn is_failed(&self, kind: MetricKind) -> bool {
        self.partial_failures.iter().any(|f| f.kind == kind)
    }

    pub fn disk_failure(&self, index: usize) -> Option<&PartialFailure> {
        self.partial_failures
            .iter()
            .find(|f| f.kind == MetricKind::Disk && f.disk_index == Some(index))
    }

    pub fn is_complete(&self) -> bool {
        self.partial_failures.is_empty()
    }
}

impl Validatable for Snapshot {
    fn validate(&self) -> Result<(), String> {
        if let Some(cpu) = &self.cpu {
            cpu.validate()?;
        }
        if let Some(memory) = &self.memory {
            memory.validate()?;
        }
        if let Some(processes) = &self.processes {
            processes.validate()?;
        }
        for disk in &self.disks {
            disk.validate()?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct SnapshotBuilder {
    id: Option<String>,
    hostname: Option<String>,
    collected_at: Option<DateTime<Utc>>,
    containerized: bool,
    uptime: Option<Duration>,
    cpu: Option<CpuReading>,
    memory: Option<MemoryReading>,
    disks: Vec<DiskReading>,
    network: Option<NetworkReading>,
    processes: Option<ProcessReading>,
    partial_failures: Vec<PartialFailure>,
    timed_out: bool,
    warnings: Vec<String>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: String) -> Self {
        self.id = Some(id);
        self
    }

    pub fn hostname(mut self, hostname: String) -> Self {
        self.hostname = Some(hostname);
        self
    }

    pub fn collected_at(mut self, collected_at: DateTime<Utc>) -> Self {
        self.collected_at = Some(collected_at);
        self
    }

    pub fn containerized(mut self, containerized: bool) -> Self {
        self.containerized = containerized;
        self
    }

    pub fn uptime(mut self, uptime: Duration) -> Self {
        self.uptime = Some(uptime);
        self
    }

    pub fn cpu(mut self, cpu: CpuReading) -> Self {
        self.cpu = Some(cpu);
        self
    }

    pub fn memory(mut self, memory: MemoryReading) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn disk(mut self, disk: DiskReading) -> Self {
        self.disks.push(disk);
        self
    }

    pub fn network(mut self, network: NetworkReading) -> Self {
        self.network = Some(network);
        self
    }

    pub fn processes(mut self, processes: ProcessReading) -> Self {
        self.processes = Some(processes);
        self
    }

    pub fn failure(mut self, failure: PartialFailure) -> Self {
        self.partial_failures.push(failure);
        self
    }

    pub fn timed_out(mut self, timed_out: bool) -> Self {
        self.timed_out = timed_out;
        self
    }

    pub fn warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn build(self) -> Result<Snapshot, String> {
        let snapshot = Snapshot {
            id: self.id.ok_or("id is required")?,
            hostname: self.hostname.ok_or("hostname is required")?,
            collected_at: self.collected_at.ok_or("collected_at is required")?,
            containerized: self.containerized,
            uptime: self.uptime,
            cpu: self.cpu,
            memory: self.memory,
            disks: self.disks,
            network: self.network,
            processes: self.processes,
            partial_failures: self.partial_failures,
            timed_out: self.timed_out,
            warnings: self.warnings,
        };

        snapshot.validate()?;
        Ok(snapshot)
    }
}
