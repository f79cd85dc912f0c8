use std::path::{Path, PathBuf};

use anyhow::Result;
use directories::ProjectDirs;
use kittens_core::config::{DEFAULT_SOURCE_URL, parse_source_url};
use kittens_core::{ConfigError, ModelConfig, default_roster};

use super::types::{
    DEFAULT_SOURCE_TIMEOUT_SECS, KittensConfig, ModelSection, RawKittensConfig, RawModelConfig,
    RawServerConfig, RawSourceConfig, RawStoreConfig, ServerSection, SourceSection, StoreSection,
};

/// Environment variable overriding the project config directory
pub const PROJECT_CONFIG_DIR_ENV: &str = "KITTENS_PROJECT_CONFIG_DIR";

const STORE_FILE_NAME: &str = "kittens.sqlite";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<KittensConfig> {
        Self::load_with(RawKittensConfig::default())
    }

    /// Load merged configuration with `overrides` (usually CLI flags) applied last
    pub fn load_with(overrides: RawKittensConfig) -> Result<KittensConfig> {
        let mut raw = RawKittensConfig::default();

        // Layer 1: User config
        if let Some(user_path) = Self::user_config_path()
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(&user_path)?);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&project_path)?);
        }

        // Layer 3: Command line
        raw = Self::merge_raw(raw, overrides);

        Ok(Self::finalize(raw)?)
    }

    fn read_raw(path: &Path) -> Result<RawKittensConfig, ConfigError> {
        let read_error = |reason: String| ConfigError::Read {
            path: path.display().to_string(),
            reason,
        };
        let contents = std::fs::read_to_string(path).map_err(|e| read_error(e.to_string()))?;
        toml::from_str(&contents).map_err(|e| read_error(e.to_string()))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "kittens").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with KITTENS_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_DIR_ENV) {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".kittens/config.toml")
        }
    }

    /// Database location used when none is configured
    pub fn default_store_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "kittens").map(|dirs| dirs.data_dir().join(STORE_FILE_NAME))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawKittensConfig, overlay: RawKittensConfig) -> RawKittensConfig {
        RawKittensConfig {
            source: Self::merge_source(base.source, overlay.source),
            log_source: Self::merge_source(base.log_source, overlay.log_source),
            store: RawStoreConfig {
                path: overlay.store.path.or(base.store.path),
            },
            model: RawModelConfig {
                poll_interval_secs: overlay
                    .model
                    .poll_interval_secs
                    .or(base.model.poll_interval_secs),
                earliest_revision: overlay
                    .model
                    .earliest_revision
                    .or(base.model.earliest_revision),
                snapshot_window: overlay.model.snapshot_window.or(base.model.snapshot_window),
                rebuild_on_start: overlay
                    .model
                    .rebuild_on_start
                    .or(base.model.rebuild_on_start),
                version: overlay.model.version.or(base.model.version),
            },
            server: RawServerConfig {
                host: overlay.server.host.or(base.server.host),
                port: overlay.server.port.or(base.server.port),
                public_dir: overlay.server.public_dir.or(base.server.public_dir),
            },
            contributors: overlay.contributors.or(base.contributors),
        }
    }

    fn merge_source(base: RawSourceConfig, overlay: RawSourceConfig) -> RawSourceConfig {
        RawSourceConfig {
            url: overlay.url.or(base.url),
            timeout_secs: overlay.timeout_secs.or(base.timeout_secs),
        }
    }

    /// Convert raw config to final config with defaults applied
    ///
    /// The log source falls back to the tracked source.
    pub fn finalize(raw: RawKittensConfig) -> Result<KittensConfig, ConfigError> {
        let source = SourceSection {
            url: raw
                .source
                .url
                .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
            timeout_secs: raw
                .source
                .timeout_secs
                .unwrap_or(DEFAULT_SOURCE_TIMEOUT_SECS),
        };
        parse_source_url(&source.url)?;

        let log_source = SourceSection {
            url: raw.log_source.url.unwrap_or_else(|| source.url.clone()),
            timeout_secs: raw.log_source.timeout_secs.unwrap_or(source.timeout_secs),
        };
        parse_source_url(&log_source.url)?;

        let path = match raw.store.path {
            Some(path) => path,
            None => Self::default_store_path().ok_or(ConfigError::NoDataDir)?,
        };

        let defaults = ModelConfig::default();
        let config = KittensConfig {
            source,
            log_source,
            store: StoreSection { path },
            model: ModelSection {
                poll_interval_secs: raw
                    .model
                    .poll_interval_secs
                    .unwrap_or(defaults.poll_interval.as_secs()),
                earliest_revision: raw
                    .model
                    .earliest_revision
                    .unwrap_or(defaults.earliest_revision),
                snapshot_window: raw.model.snapshot_window.unwrap_or(defaults.snapshot_window),
                rebuild_on_start: raw.model.rebuild_on_start.unwrap_or(defaults.rebuild_on_start),
                version: raw.model.version.unwrap_or(defaults.version),
            },
            server: ServerSection {
                host: raw
                    .server
                    .host
                    .unwrap_or_else(|| kittens_server::ServerConfig::default().host),
                port: raw.server.port.unwrap_or(kittens_server::DEFAULT_PORT),
                public_dir: raw.server.public_dir,
            },
            contributors: raw.contributors.unwrap_or_else(default_roster),
        };

        config.model_config().validate()?;
        Ok(config)
    }

    /// Load config from a specific path (for testing)
    #[cfg(test)]
    pub fn load_from_path(path: &Path) -> Result<KittensConfig> {
        let raw = if path.exists() {
            Self::read_raw(path)?
        } else {
            RawKittensConfig::default()
        };
        Ok(Self::finalize(raw)?)
    }
}
