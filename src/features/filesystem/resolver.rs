use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use sysinfo::Disks;

use crate::features::filesystem::models::{DiskTarget, Partition};
use crate::shared::config::{DiskPathEntry, StatusConfig};
use crate::shared::error::ConfigError;

const MAX_PATH_LEN: usize = 1024;

const FORBIDDEN_PATTERNS: [&str; 11] = [
    "..", "~", "\0", "*", "?", "|", "<", ">", "\"", "//", "\\\\",
];

/// Filesystems that never represent a physical partition.
const IGNORED_FS_TYPES: [&str; 17] = [
    "nfs", "nfs4", "smbfs", "cifs", "tmpfs", "devtmpfs", "proc", "sysfs",
    "fuse.gvfsd-fuse", "overlay", "squashfs", "autofs", "mqueue", "devpts",
    "hugetlbfs", "configfs", "cgroup2",
];

#[derive(Debug, Default)]
pub struct Resolution {
    pub targets: Vec<DiskTarget>,
    /// Configuration entries that were dropped.
    pub warnings: Vec<ConfigError>,
    pub discovered: bool,
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    auto_discover: bool,
    max_discovered: usize,
}

impl PathResolver {
    pub fn new(auto_discover: bool, max_discovered: usize) -> Self {
        Self { auto_discover, max_discovered }
    }

    pub fn from_config(config: &StatusConfig) -> Self {
        Self::new(config.auto_discover_disks, config.max_disk_count)
    }

    pub fn resolve(&self, entries: &[DiskPathEntry]) -> Resolution {
        self.resolve_with(entries, system_partitions)
    }

    /// Resolves configured entries, falling back to `discover` when none survive.
    pub fn resolve_with<F>(&self, entries: &[DiskPathEntry], discover: F) -> Resolution
    where
        F: FnOnce() -> Vec<Partition>,
    {
        let mut resolution = Resolution::default();
        let mut seen: HashMap<PathBuf, String> = HashMap::new();

        for entry in entries {
            let target = match validate_entry(entry) {
                Ok(target) => target,
                Err(e) => {
                    resolution.warnings.push(e);
                    continue;
                }
            };
            if let Some(first) = seen.get(&target.canonical) {
                resolution.warnings.push(ConfigError::Duplicate {
                    path: target.path,
                    first: first.clone(),
                });
                continue;
            }
            seen.insert(target.canonical.clone(), target.path.clone());
            resolution.targets.push(target);
        }

        if resolution.targets.is_empty() && self.auto_discover {
            resolution.targets = self.discover(discover(), &mut seen);
            resolution.discovered = true;
            info!("Auto-discovered {} disks", resolution.targets.len());
        }

        resolution
    }

    fn discover(&self, partitions: Vec<Partition>, seen: &mut HashMap<PathBuf, String>) -> Vec<DiskTarget> {
        let mut devices = HashSet::new();
        let mut targets = Vec::new();

        for partition in partitions {
            if targets.len() >= self.max_discovered {
                debug!("Disk discovery capped at {} partitions", self.max_discovered);
                break;
            }
            let fs_type = partition.file_system.to_ascii_lowercase();
            if IGNORED_FS_TYPES.contains(&fs_type.as_str()) {
                continue;
            }
            if !partition.device.is_empty() && !devices.insert(partition.device.clone()) {
                continue;
            }
            let mount_point = partition.mount_point.to_string_lossy().into_owned();
            if let Err(e) = check_path_safety(&mount_point) {
                debug!("Skipping discovered partition: {}", e);
                continue;
            }
            let canonical = match fs::canonicalize(&partition.mount_point) {
                Ok(canonical) => canonical,
                Err(e) => {
                    debug!("Skipping discovered partition {}: {}", mount_point, e);
                    continue;
                }
            };
            if seen.contains_key(&canonical) {
                continue;
            }
            seen.insert(canonical.clone(), mount_point.clone());
            targets.push(DiskTarget::new(mount_point, None, canonical));
        }

        targets
    }
}

/// Rejects paths that are empty, relative, oversized, or carry traversal patterns.
pub fn check_path_safety(path: &str) -> Result<(), ConfigError> {
    if path.is_empty() {
        return Err(ConfigError::EmptyPath);
    }
    if path.len() > MAX_PATH_LEN || FORBIDDEN_PATTERNS.iter().any(|p| path.contains(p)) {
        return Err(ConfigError::UnsafePath(path.to_string()));
    }
    if cfg!(windows) && path.find(':').map_or(false, |i| i > 1) {
        return Err(ConfigError::UnsafePath(path.to_string()));
    }
    if !Path::new(path).is_absolute() {
        return Err(ConfigError::NotAbsolute(path.to_string()));
    }
    Ok(())
}

fn validate_entry(entry: &DiskPathEntry) -> Result<DiskTarget, ConfigError> {
    let path = normalize(entry.path());
    check_path_safety(&path)?;
    let canonical = fs::canonicalize(&path).map_err(|e| ConfigError::Inaccessible {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    Ok(DiskTarget::new(path, entry.display(), canonical))
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.len() > 1 && trimmed.ends_with('/') {
        trimmed.trim_end_matches('/').to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn system_partitions() -> Vec<Partition> {
    Disks::new_with_refreshed_list()
        .list()
        .iter()
        .map(|disk| Partition {
            device: disk.name().to_string_lossy().into_owned(),
            mount_point: disk.mount_point().to_path_buf(),
            file_system: disk.file_system().to_string_lossy().into_owned(),
        })
        .collect()
}
