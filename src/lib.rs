pub mod features;
pub mod service;
pub mod shared;

// Re-export commonly used items from features
pub use features::filesystem::{
    DiskReading,
    DiskSource,
    DiskTarget,
    Partition,
    PathResolver,
    Resolution,
};
pub use features::network::{NetworkReading, NetworkSource};
pub use features::report::{Formatter, ReportView};
pub use features::system_metrics::{
    CpuReading,
    CpuSource,
    MemoryReading,
    MemorySource,
    PartialFailure,
    ProcessReading,
    ProcessSource,
    Snapshot,
    Temperature,
    UptimeSource,
};

// Re-export shared functionality
pub use shared::cache::{Cache, CacheEntry};
pub use shared::collector::{Collector, CollectorState, SourceTable};
pub use shared::config::{DiskPathEntry, OutputFormat, PrivacyLevel, StatusConfig};
pub use shared::error::{CollectionError, ConfigError, StatusError};
pub use shared::traits::{CollectContext, MetricKind, MetricSource, Reading};

pub use service::{get_status, StatusService};
