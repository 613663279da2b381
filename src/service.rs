use log::{error, info};

use crate::features::report::Formatter;
use crate::shared::cache::Cache;
use crate::shared::collector::{Collector, SourceTable};
use crate::shared::config::{PrivacyLevel, StatusConfig};
use crate::shared::error::StatusError;

/// Owns the snapshot cache and formatter for the life of the process.
pub struct StatusService {
    cache: Cache,
    formatter: Formatter,
    default_privacy: PrivacyLevel,
}

impl StatusService {
    pub fn new(config: StatusConfig) -> Self {
        Self::with_sources(config, SourceTable::system())
    }

    pub fn with_sources(config: StatusConfig, sources: SourceTable) -> Self {
        let config = config.validated();
        info!(
            "Status service ready: privacy={}, cache={}s, timeout={}s, {} disk entries",
            config.privacy_level,
            config.cache_duration,
            config.collect_timeout,
            config.disk_paths.len()
        );
        let collector = Collector::new(&config, sources);
        Self {
            cache: Cache::new(collector, config.cache_ttl()),
            formatter: Formatter::from_config(&config),
            default_privacy: config.privacy_level,
        }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn default_privacy(&self) -> PrivacyLevel {
        self.default_privacy
    }

    pub async fn get_status(&self, force_refresh: bool, privacy: PrivacyLevel) -> Result<String, StatusError> {
        match self.cache.get_or_collect(force_refresh).await {
            Ok(snapshot) => Ok(self.formatter.render(&snapshot, privacy)),
            Err(e) => {
                error!("Status request failed: {}", e);
                Err(e)
            }
        }
    }
}

/// Entry point for command layers: collect (or reuse) a snapshot and render it.
pub async fn get_status(
    service: &StatusService,
    force_refresh: bool,
    privacy: PrivacyLevel,
) -> Result<String, StatusError> {
    service.get_status(force_refresh, privacy).await
}
