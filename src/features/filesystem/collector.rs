use async_trait::async_trait;
use log::debug;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::features::filesystem::models::{DiskReading, DiskTarget};
use crate::shared::error::CollectionError;
use crate::shared::traits::{run_blocking, CollectContext, MetricKind, MetricSource, Reading};

/// Stats the disk holding `ctx.target`. Runs once per resolved target.
#[derive(Debug, Default)]
pub struct DiskSource;

impl DiskSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricSource for DiskSource {
    fn kind(&self) -> MetricKind {
        MetricKind::Disk
    }

    async fn collect(&self, ctx: &CollectContext) -> Result<Reading, CollectionError> {
        let target = ctx.target.clone().ok_or_else(|| {
            CollectionError::system_api(MetricKind::Disk, "disk task started without a target")
        })?;
        run_blocking(MetricKind::Disk, ctx, move || stat_target(&target))
            .await
            .map(Reading::Disk)
    }
}

fn stat_target(target: &DiskTarget) -> Result<DiskReading, CollectionError> {
    // A target can vanish between resolution and collection.
    if let Err(e) = fs::metadata(&target.canonical) {
        let reason = match e.kind() {
            ErrorKind::NotFound => "path no longer exists".to_string(),
            ErrorKind::PermissionDenied => "permission denied".to_string(),
            _ => e.to_string(),
        };
        return Err(CollectionError::unavailable(MetricKind::Disk, reason));
    }

    let (total, used) = usage(&target.canonical)?;
    let reading = DiskReading::new(target, total, used);
    debug!("Disk {}: {:.1}% used", target.path, reading.percent);
    Ok(reading)
}

#[cfg(unix)]
fn usage(path: &Path) -> Result<(u64, u64), CollectionError> {
    use nix::sys::statvfs::statvfs;

    let stats = statvfs(path)
        .map_err(|e| CollectionError::system_api(MetricKind::Disk, format!("statvfs failed: {}", e)))?;

    let fragment = stats.fragment_size() as u64;
    let total = stats.blocks() as u64 * fragment;
    let free = stats.blocks_free() as u64 * fragment;
    Ok((total, total.saturating_sub(free)))
}

#[cfg(not(unix))]
fn usage(path: &Path) -> Result<(u64, u64), CollectionError> {
    use sysinfo::Disks;

    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| {
            let total = disk.total_space();
            (total, total.saturating_sub(disk.available_space()))
        })
        .ok_or_else(|| CollectionError::unavailable(MetricKind::Disk, "no mounted disk holds this path"))
}
