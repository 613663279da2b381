use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::shared::traits::Validatable;

/// A validated disk to stat during collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskTarget {
    /// Path as configured (or the discovered mount point).
    pub path: String,
    pub display_name: String,
    /// Resolved path used for deduplication and statting.
    pub canonical: PathBuf,
}

impl DiskTarget {
    pub fn new(path: impl Into<String>, display: Option<&str>, canonical: PathBuf) -> Self {
        let path = path.into();
        let display_name = display
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| path.clone());
        Self { path, display_name, canonical }
    }

    pub fn has_alias(&self) -> bool {
        self.display_name != self.path
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskReading {
    pub path: String,
    pub display_name: String,
    pub total: u64,
    pub used: u64,
    pub percent: f64,
}

impl DiskReading {
    /// Builds a reading, clamping `used` to `total` and deriving `percent`.
    pub fn new(target: &DiskTarget, total: u64, used: u64) -> Self {
        let used = used.min(total);
        Self {
            path: target.path.clone(),
            display_name: target.display_name.clone(),
            total,
            used,
            percent: percentage(used, total),
        }
    }
}

impl Validatable for DiskReading {
    fn validate(&self) -> Result<(), String> {
        if self.used > self.total {
            return Err(format!("Used space exceeds total space for disk {}", self.path));
        }
        if !(0.0..=100.0).contains(&self.percent) {
            return Err(format!("Usage percentage out of range for disk {}", self.path));
        }
        Ok(())
    }
}

/// A mounted partition reported by the OS, input to auto-discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub device: String,
    pub mount_point: PathBuf,
    pub file_system: String,
}

pub(crate) fn percentage(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}
