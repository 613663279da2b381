use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::shared::error::CollectionError;
use crate::features::filesystem::{DiskReading, DiskTarget};
use crate::features::network::NetworkReading;
use crate::features::system_metrics::{CpuReading, MemoryReading, ProcessReading};

/// The closed set of metric categories a collection cycle gathers.
///
/// Ordering is the order categories appear in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Uptime,
    Cpu,
    Memory,
    Disk,
    Network,
    Processes,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uptime => "uptime",
            Self::Cpu => "cpu",
            Self::Memory => "memory",
            Self::Disk => "disk",
            Self::Network => "network",
            Self::Processes => "processes",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One category's contribution to a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Uptime(Duration),
    Cpu(CpuReading),
    Memory(MemoryReading),
    Disk(DiskReading),
    Network(NetworkReading),
    Processes(ProcessReading),
}

impl Reading {
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Uptime(_) => MetricKind::Uptime,
            Self::Cpu(_) => MetricKind::Cpu,
            Self::Memory(_) => MetricKind::Memory,
            Self::Disk(_) => MetricKind::Disk,
            Self::Network(_) => MetricKind::Network,
            Self::Processes(_) => MetricKind::Processes,
        }
    }
}

impl Validatable for Reading {
    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Uptime(_) | Self::Network(_) => Ok(()),
            Self::Cpu(cpu) => cpu.validate(),
            Self::Memory(memory) => memory.validate(),
            Self::Disk(disk) => disk.validate(),
            Self::Processes(processes) => processes.validate(),
        }
    }
}

/// Per-task inputs handed to a source by the collector.
#[derive(Debug, Clone)]
pub struct CollectContext {
    pub cancel: CancellationToken,
    pub show_temp: bool,
    pub containerized: bool,
    /// Set only for disk tasks.
    pub target: Option<DiskTarget>,
}

impl CollectContext {
    pub fn new(cancel: CancellationToken, show_temp: bool) -> Self {
        Self { cancel, show_temp, containerized: false, target: None }
    }

    pub fn containerized(mut self, containerized: bool) -> Self {
        self.containerized = containerized;
        self
    }

    /// Same settings under a child token.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            show_temp: self.show_temp,
            containerized: self.containerized,
            target: None,
        }
    }

    pub fn for_target(&self, target: DiskTarget) -> Self {
        Self { target: Some(target), ..self.child() }
    }
}

#[async_trait]
pub trait MetricSource: Send + Sync {
    fn kind(&self) -> MetricKind;

    /// Gather one reading. Must return promptly once `ctx.cancel` fires.
    async fn collect(&self, ctx: &CollectContext) -> Result<Reading, CollectionError>;
}

pub trait Validatable {
    fn validate(&self) -> Result<(), String>;
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Runs a blocking OS call on the blocking pool, racing it against cancellation.
///
/// A cancelled call keeps running on its worker thread until the OS returns; its
/// result is dropped.
pub async fn run_blocking<T, F>(
    kind: MetricKind,
    ctx: &CollectContext,
    call: F,
) -> Result<T, CollectionError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CollectionError> + Send + 'static,
{
    if ctx.cancel.is_cancelled() {
        return Err(CollectionError::Cancelled(kind));
    }
    let handle = tokio::task::spawn_blocking(call);
    tokio::select! {
        _ = ctx.cancel.cancelled() => Err(CollectionError::Cancelled(kind)),
        joined = handle => match joined {
            Ok(result) => result,
            Err(e) => Err(CollectionError::system_api(kind, format!("worker failed: {}", e))),
        },
    }
}
