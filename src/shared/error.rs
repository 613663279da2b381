use thiserror::Error;
use std::io;

use crate::shared::traits::MetricKind;

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("Collection failed: {0}")]
    CollectionFailed(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("{kind} unavailable: {reason}")]
    Unavailable { kind: MetricKind, reason: String },

    #[error("{0} collection cancelled")]
    Cancelled(MetricKind),

    #[error("{kind} system API error: {reason}")]
    SystemApi { kind: MetricKind, reason: String },

    #[error("{kind} IO error: {source}")]
    Io {
        kind: MetricKind,
        #[source]
        source: io::Error,
    },

    #[error("{0} source returned a reading of the wrong kind")]
    UnexpectedReading(MetricKind),

    #[error("{kind} reading rejected: {reason}")]
    InvalidReading { kind: MetricKind, reason: String },
}

impl CollectionError {
    pub fn unavailable(kind: MetricKind, reason: impl Into<String>) -> Self {
        Self::Unavailable { kind, reason: reason.into() }
    }

    pub fn system_api(kind: MetricKind, reason: impl Into<String>) -> Self {
        Self::SystemApi { kind, reason: reason.into() }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Unavailable { kind, .. }
            | Self::SystemApi { kind, .. }
            | Self::Io { kind, .. }
            | Self::InvalidReading { kind, .. } => *kind,
            Self::Cancelled(kind) | Self::UnexpectedReading(kind) => *kind,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Disk path is empty")]
    EmptyPath,

    #[error("Disk path '{0}' is not absolute")]
    NotAbsolute(String),

    #[error("Disk path '{0}' contains a forbidden pattern")]
    UnsafePath(String),

    #[error("Disk path '{path}' is not accessible: {reason}")]
    Inaccessible { path: String, reason: String },

    #[error("Disk path '{path}' duplicates '{first}'")]
    Duplicate { path: String, first: String },

    #[error("Failed to read config: {0}")]
    Read(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}
