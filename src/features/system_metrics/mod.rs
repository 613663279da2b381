mod collector;
mod models;

pub use collector::{is_containerized, CpuSource, MemorySource, ProcessSource, UptimeSource};
pub use models::{
    CpuReading,
    MemoryReading,
    PartialFailure,
    ProcessReading,
    Snapshot,
    SnapshotBuilder,
    Temperature,
};
