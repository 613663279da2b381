mod formatter;
mod models;

pub use formatter::{format_bytes, format_uptime, sanitize_display_name, Formatter};
pub use models::{CpuView, DiskView, MemoryView, NetworkView, ReportView};
