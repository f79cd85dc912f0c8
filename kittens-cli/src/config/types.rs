use std::path::PathBuf;
use std::time::Duration;

use kittens_core::{ContributorConfig, ModelConfig};
use serde::{Deserialize, Serialize};

/// Default timeout for a single request to the revision source
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 30;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawKittensConfig {
    #[serde(default)]
    pub source: RawSourceConfig,

    /// Source answering `/api/log`, defaults to `source`
    #[serde(default)]
    pub log_source: RawSourceConfig,

    #[serde(default)]
    pub store: RawStoreConfig,

    #[serde(default)]
    pub model: RawModelConfig,

    #[serde(default)]
    pub server: RawServerConfig,

    /// Roster; replaces the lower layer's roster when present
    pub contributors: Option<Vec<ContributorConfig>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSourceConfig {
    /// Repository URL
    pub url: Option<String>,

    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawStoreConfig {
    /// SQLite database file
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawModelConfig {
    pub poll_interval_secs: Option<u64>,

    /// First revision ingested into an empty store
    pub earliest_revision: Option<i64>,

    /// Revisions included in a subscriber snapshot
    pub snapshot_window: Option<usize>,

    /// Re-derive attribution links on startup
    pub rebuild_on_start: Option<bool>,

    /// Version token handed to subscribers
    pub version: Option<String>,
}

/// Server config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerConfig {
    pub host: Option<String>,

    pub port: Option<u16>,

    /// Directory served for unmatched paths
    pub public_dir: Option<PathBuf>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KittensConfig {
    pub source: SourceSection,
    pub log_source: SourceSection,
    pub store: StoreSection,
    pub model: ModelSection,
    pub server: ServerSection,
    pub contributors: Vec<ContributorConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSection {
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSection {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSection {
    pub poll_interval_secs: u64,
    pub earliest_revision: i64,
    pub snapshot_window: usize,
    pub rebuild_on_start: bool,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_dir: Option<PathBuf>,
}

impl SourceSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl KittensConfig {
    /// Settings for the reconciliation model
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            roster: self.contributors.clone(),
            earliest_revision: self.model.earliest_revision,
            poll_interval: Duration::from_secs(self.model.poll_interval_secs),
            snapshot_window: self.model.snapshot_window,
            rebuild_on_start: self.model.rebuild_on_start,
            version: self.model.version.clone(),
        }
    }

    pub fn server_config(&self) -> kittens_server::ServerConfig {
        kittens_server::ServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            public_dir: self.server.public_dir.clone(),
        }
    }

    /// Whether `/api/log` is answered by a different repository than the tracked one
    pub fn has_separate_log_source(&self) -> bool {
        self.log_source != self.source
    }
}
