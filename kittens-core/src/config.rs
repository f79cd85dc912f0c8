//! Model configuration and the default contributor roster

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default repository followed by the model
pub const DEFAULT_SOURCE_URL: &str = "http://svn.webkit.org/repository/webkit/trunk";

/// First revision ingested into an empty store for [`DEFAULT_SOURCE_URL`]
pub const DEFAULT_EARLIEST_REVISION: i64 = 48167;

/// Number of recent revisions included in a subscriber snapshot
pub const DEFAULT_SNAPSHOT_WINDOW: usize = 100;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// A roster entry as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorConfig {
    pub email: String,
    pub name: String,
}

impl ContributorConfig {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }
}

/// The roster tracked when none is configured
pub fn default_roster() -> Vec<ContributorConfig> {
    vec![
        ContributorConfig::new("knorton@google.com", "Kelly Norton"),
        ContributorConfig::new("jgw@google.com", "Joel Webber"),
        ContributorConfig::new("schenney@google.com", "Stephen Chenney"),
        ContributorConfig::new("pdr@google.com", "Philip Rogers"),
        ContributorConfig::new("fmalita@google.com", "Florin Malita"),
    ]
}

/// Settings for the reconciliation model
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Contributors to seed into the store on load
    pub roster: Vec<ContributorConfig>,
    /// First revision eligible for ingestion when the store is empty
    pub earliest_revision: i64,
    pub poll_interval: Duration,
    pub snapshot_window: usize,
    /// Re-derive every attribution link while loading
    pub rebuild_on_start: bool,
    /// Token handed to subscribers in the connect snapshot
    pub version: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            roster: default_roster(),
            earliest_revision: DEFAULT_EARLIEST_REVISION,
            poll_interval: DEFAULT_POLL_INTERVAL,
            snapshot_window: DEFAULT_SNAPSHOT_WINDOW,
            rebuild_on_start: false,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ModelConfig {
    #[must_use]
    pub fn with_roster(mut self, roster: Vec<ContributorConfig>) -> Self {
        self.roster = roster;
        self
    }

    #[must_use]
    pub fn with_earliest_revision(mut self, revision: i64) -> Self {
        self.earliest_revision = revision;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_rebuild_on_start(mut self, rebuild: bool) -> Self {
        self.rebuild_on_start = rebuild;
        self
    }

    /// Reject settings the model cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.snapshot_window == 0 {
            return Err(ConfigError::ZeroSnapshotWindow);
        }

        let mut seen = HashSet::new();
        for contributor in &self.roster {
            let email = contributor.email.trim();
            if email.is_empty() || email.contains(char::is_whitespace) {
                return Err(ConfigError::InvalidContributor(contributor.email.clone()));
            }
            if !seen.insert(email) {
                return Err(ConfigError::DuplicateContributor(email.to_string()));
            }
        }
        Ok(())
    }
}

/// Validate a source URL, returning it parsed
pub fn parse_source_url(raw: &str) -> Result<url::Url, ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ModelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.roster.len(), 5);
        assert_eq!(config.snapshot_window, 100);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let config = ModelConfig::default().with_poll_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(ConfigError::ZeroPollInterval)));
    }

    #[test]
    fn duplicate_roster_email_is_rejected() {
        let config = ModelConfig::default().with_roster(vec![
            ContributorConfig::new("a@x.com", "A"),
            ContributorConfig::new("a@x.com", "Also A"),
        ]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateContributor(email)) if email == "a@x.com"
        ));
    }

    #[test]
    fn blank_roster_email_is_rejected() {
        let config = ModelConfig::default().with_roster(vec![ContributorConfig::new(" ", "Nobody")]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidContributor(_))
        ));
    }

    #[test]
    fn source_url_requires_http() {
        assert!(parse_source_url(DEFAULT_SOURCE_URL).is_ok());
        assert!(parse_source_url("svn://svn.webkit.org/repository").is_err());
        assert!(parse_source_url("not a url").is_err());
    }
}
