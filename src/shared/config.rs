use clap::ValueEnum;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::shared::error::ConfigError;

pub const COLLECT_TIMEOUT_RANGE: (u64, u64) = (10, 120);
pub const CACHE_DURATION_RANGE: (u64, u64) = (0, 3600);
pub const MAX_DISK_COUNT_RANGE: (usize, usize) = (1, 50);
pub const MAX_WORKERS_RANGE: (usize, usize) = (1, 16);

const DEFAULT_COLLECT_TIMEOUT: u64 = 25;
const DEFAULT_CACHE_DURATION: u64 = 10;
const DEFAULT_MAX_DISK_COUNT: usize = 10;
const DEFAULT_MAX_WORKERS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyLevel {
    #[default]
    Full,
    Minimal,
}

impl fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Minimal => f.write_str("minimal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Plain,
    Json,
}

/// A configured disk: either a bare path or a path with a display alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiskPathEntry {
    Path(String),
    Aliased {
        path: String,
        #[serde(default)]
        display: Option<String>,
    },
}

impl DiskPathEntry {
    pub fn path(&self) -> &str {
        match self {
            Self::Path(path) | Self::Aliased { path, .. } => path,
        }
    }

    pub fn display(&self) -> Option<&str> {
        match self {
            Self::Path(_) => None,
            Self::Aliased { display, .. } => display.as_deref(),
        }
    }
}

impl From<&str> for DiskPathEntry {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub privacy_level: PrivacyLevel,
    pub disk_paths: Vec<DiskPathEntry>,
    /// Seconds.
    pub collect_timeout: u64,
    /// Seconds; zero disables caching.
    pub cache_duration: u64,
    pub show_temp: bool,
    pub auto_discover_disks: bool,
    pub max_disk_count: usize,
    pub max_workers: usize,
    pub output_format: OutputFormat,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            privacy_level: PrivacyLevel::Full,
            disk_paths: Vec::new(),
            collect_timeout: DEFAULT_COLLECT_TIMEOUT,
            cache_duration: DEFAULT_CACHE_DURATION,
            show_temp: true,
            auto_discover_disks: true,
            max_disk_count: DEFAULT_MAX_DISK_COUNT,
            max_workers: DEFAULT_MAX_WORKERS,
            output_format: OutputFormat::Markdown,
        }
    }
}

impl StatusConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Reading config from: {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: StatusConfig = serde_yaml::from_str(content)?;
        Ok(config.validated())
    }

    /// Replaces out-of-range numeric settings with their defaults.
    pub fn validated(mut self) -> Self {
        self.collect_timeout = clamp_or_default(
            "collect_timeout",
            self.collect_timeout,
            COLLECT_TIMEOUT_RANGE,
            DEFAULT_COLLECT_TIMEOUT,
        );
        self.cache_duration = clamp_or_default(
            "cache_duration",
            self.cache_duration,
            CACHE_DURATION_RANGE,
            DEFAULT_CACHE_DURATION,
        );
        self.max_disk_count = clamp_or_default(
            "max_disk_count",
            self.max_disk_count,
            MAX_DISK_COUNT_RANGE,
            DEFAULT_MAX_DISK_COUNT,
        );
        self.max_workers = clamp_or_default(
            "max_workers",
            self.max_workers,
            MAX_WORKERS_RANGE,
            DEFAULT_MAX_WORKERS,
        );
        self
    }

    pub fn collect_timeout(&self) -> Duration {
        Duration::from_secs(self.collect_timeout)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_duration)
    }
}

fn clamp_or_default<T>(name: &str, value: T, (min, max): (T, T), default: T) -> T
where
    T: PartialOrd + Copy + fmt::Display,
{
    if value < min || value > max {
        warn!(
            "{} = {} is outside [{}, {}], using default {}",
            name, value, min, max, default
        );
        default
    } else {
        value
    }
}
