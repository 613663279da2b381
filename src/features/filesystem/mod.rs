mod collector;
mod models;
mod resolver;

pub use collector::DiskSource;
pub use models::{DiskReading, DiskTarget, Partition};
pub(crate) use models::percentage;
pub use resolver::{check_path_safety, system_partitions, PathResolver, Resolution};
