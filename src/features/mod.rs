pub mod filesystem;
pub mod network;
pub mod report;
pub mod system_metrics;
