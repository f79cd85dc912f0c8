//! REST API handlers

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use kittens_core::{ModelStatus, UpdateStatus};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::AppState;

/// Error body returned by API handlers
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `stopped` when the model actor is gone
    pub status: String,
    /// Server version
    pub version: String,
    /// Seconds since server started
    pub uptime_seconds: i64,
    /// Model status, absent when the model is not running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelStatus>,
}

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let model = state.model.status().await.ok();
    let status = if model.is_some() { "ok" } else { "stopped" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        model,
    })
}

/// POST /api/update - Run an update cycle and wait for its outcome
///
/// A cycle that fails on the revision source is reported with 502.
pub async fn update(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<UpdateStatus>), (StatusCode, Json<ErrorResponse>)> {
    let status = state.model.request_update().await.map_err(|e| {
        warn!("Update request failed: {}", e);
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new(e.to_string(), "MODEL_STOPPED")),
        )
    })?;

    let code = if status.error.is_some() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };
    Ok((code, Json(status)))
}
