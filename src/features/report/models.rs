use serde::Serialize;

use crate::features::system_metrics::{ProcessReading, Snapshot, Temperature};
use crate::shared::config::PrivacyLevel;
use crate::shared::traits::MetricKind;

use super::formatter::{disk_slots, DiskSlot};

/// Redacted, serializable view of a snapshot for the JSON output format.
#[derive(Debug, Serialize)]
pub struct ReportView {
    pub privacy_level: PrivacyLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub collected_at: String,
    pub containerized: bool,
    pub partial: bool,
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryView>,
    pub disks: Vec<DiskView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processes: Option<ProcessReading>,
    pub unavailable: Vec<MetricKind>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CpuView {
    pub percent: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_celsius: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cores: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_mhz: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct MemoryView {
    pub percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct DiskView {
    /// 1-based position in configuration order.
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct NetworkView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_sent: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_recv: Option<u64>,
}

impl ReportView {
    pub fn new(snapshot: &Snapshot, privacy: PrivacyLevel, show_temp: bool) -> Self {
        let full = privacy == PrivacyLevel::Full;

        let cpu = snapshot.cpu.as_ref().map(|cpu| {
            let (temperature_celsius, temperature_available) = match (show_temp, full, cpu.temperature) {
                (false, _, _) | (true, _, Temperature::Disabled) => (None, None),
                (true, true, Temperature::Celsius(t)) => (Some(t), Some(true)),
                (true, _, t) => (None, Some(t.is_available())),
            };
            CpuView {
                percent: cpu.percent,
                temperature_celsius,
                temperature_available,
                cores: full.then_some(cpu.cores),
                frequency_mhz: cpu.frequency_mhz.filter(|_| full),
            }
        });

        let memory = snapshot.memory.as_ref().map(|memory| MemoryView {
            percent: memory.percent,
            used: full.then_some(memory.used),
            total: full.then_some(memory.total),
        });

        let disks = disk_slots(snapshot)
            .into_iter()
            .enumerate()
            .map(|(i, slot)| match slot {
                DiskSlot::Reading(disk) => DiskView {
                    index: i + 1,
                    name: full.then(|| disk.display_name.clone()),
                    available: true,
                    percent: Some(disk.percent),
                    used: full.then_some(disk.used),
                    total: full.then_some(disk.total),
                },
                DiskSlot::Failed(failure) => DiskView {
                    index: i + 1,
                    name: if full { failure.disk_path.clone() } else { None },
                    available: false,
                    percent: None,
                    used: None,
                    total: None,
                },
            })
            .collect();

        let network = snapshot.network.as_ref().map(|network| NetworkView {
            bytes_sent: full.then_some(network.bytes_sent),
            bytes_recv: full.then_some(network.bytes_recv),
        });

        let warnings = if full {
            snapshot.warnings.clone()
        } else if snapshot.warnings.is_empty() {
            Vec::new()
        } else {
            vec![format!("{} disk entries skipped", snapshot.warnings.len())]
        };

        Self {
            privacy_level: privacy,
            hostname: full.then(|| snapshot.hostname.clone()),
            collected_at: super::formatter::format_timestamp(snapshot, privacy),
            containerized: snapshot.containerized,
            partial: !snapshot.is_complete(),
            timed_out: snapshot.timed_out,
            uptime_seconds: snapshot.uptime.map(|u| u.as_secs()),
            cpu,
            memory,
            disks,
            network,
            processes: snapshot.processes.filter(|_| full),
            unavailable: snapshot.failed_kinds().into_iter().collect(),
            warnings,
        }
    }
}
