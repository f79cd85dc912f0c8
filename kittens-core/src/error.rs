//! Error types for kittens-core

use thiserror::Error;

use crate::model::Cursor;
use crate::store::StoreError;
use crate::types::Change;

/// Top-level error type for kittens-core
#[derive(Error, Debug)]
pub enum KittensError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

/// Errors from the remote revision source
///
/// Both variants are transient as far as the reconciliation loop is concerned.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Revision source unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed response from revision source: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Malformed(err.to_string())
        } else {
            SourceError::Unavailable(err.to_string())
        }
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::Malformed(err.to_string())
    }
}

/// Errors from the reconciliation model
#[derive(Error, Debug)]
pub enum ModelError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Poll task aborted: {0}")]
    PollAborted(String),

    #[error("Model is not running")]
    Stopped,
}

/// An update cycle that failed part way
///
/// Revisions committed before the failure are carried along so they can still
/// be published; `cursor` is the last committed position.
#[derive(Error, Debug)]
#[error("update failed at cursor {cursor} after {} committed revisions: {error}", .committed.len())]
pub struct UpdateFailure {
    pub committed: Vec<Change>,
    pub cursor: Cursor,
    #[source]
    pub error: ModelError,
}

impl UpdateFailure {
    /// A failure before anything was committed
    pub fn before_commit(cursor: Cursor, error: impl Into<ModelError>) -> Self {
        Self {
            committed: Vec::new(),
            cursor,
            error: error.into(),
        }
    }
}

/// Invalid or missing startup configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid source URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Poll interval must be greater than zero")]
    ZeroPollInterval,

    #[error("Snapshot window must be greater than zero")]
    ZeroSnapshotWindow,

    #[error("Duplicate contributor in roster: {0}")]
    DuplicateContributor(String),

    #[error("Invalid contributor email: {0:?}")]
    InvalidContributor(String),

    #[error("Failed to read config {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid attribution pattern {pattern}: {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Could not determine data directory")]
    NoDataDir,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_unavailable_displays_correctly() {
        let error = SourceError::Unavailable("connection refused".to_string());
        assert!(error.to_string().contains("unavailable"));
        assert!(error.to_string().contains("connection refused"));
    }

    #[test]
    fn source_error_malformed_displays_correctly() {
        let error = SourceError::Malformed("bad revision".to_string());
        assert!(error.to_string().contains("Malformed"));
    }

    #[test]
    fn model_error_is_transparent_over_source() {
        let error: ModelError = SourceError::Unavailable("down".to_string()).into();
        assert_eq!(error.to_string(), "Revision source unavailable: down");
    }

    #[test]
    fn update_failure_reports_committed_count() {
        let failure = UpdateFailure::before_commit(
            Cursor::at(41),
            SourceError::Unavailable("down".to_string()),
        );
        let message = failure.to_string();
        assert!(message.contains("cursor 41"));
        assert!(message.contains("0 committed"));
    }

    #[test]
    fn kittens_error_converts_from_config_error() {
        let error: KittensError = ConfigError::ZeroPollInterval.into();
        assert!(matches!(error, KittensError::Config(_)));
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn kittens_error_converts_from_model_error() {
        let error: KittensError = ModelError::Stopped.into();
        assert!(matches!(error, KittensError::Model(_)));
    }
}
