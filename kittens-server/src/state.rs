//! Shared application state for the kittens server

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kittens_core::{ModelHandle, RevisionSource};

/// Shared application state accessible by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Handle to the running model actor
    pub model: ModelHandle,
    /// Source answering `/api/log`, which may differ from the tracked repository
    pub log_source: Arc<dyn RevisionSource>,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(model: ModelHandle, log_source: Arc<dyn RevisionSource>) -> Self {
        Self {
            model,
            log_source,
            started_at: Utc::now(),
        }
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
