//! Raw log pass-through

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use kittens_core::source::{REV_FIRST, REV_HEAD};
use kittens_core::{LogLimit, Revision, RevisionRef, SourceError};
use serde::Deserialize;
use tracing::{debug, warn};

use super::api::ErrorResponse;
use crate::AppState;

pub const DEFAULT_LOG_LIMIT: i64 = 10;

/// Query for `GET /api/log`
///
/// `s` and `e` accept `-1` for HEAD and `0` for the first revision; a zero or
/// negative `l` means no limit.
#[derive(Debug, Deserialize)]
pub struct LogQuery {
    #[serde(default = "default_start")]
    pub s: i64,
    #[serde(default = "default_end")]
    pub e: i64,
    #[serde(default = "default_limit")]
    pub l: i64,
}

fn default_start() -> i64 {
    REV_HEAD
}

fn default_end() -> i64 {
    REV_FIRST
}

fn default_limit() -> i64 {
    DEFAULT_LOG_LIMIT
}

/// GET /api/log - Fetch revisions straight from the log source
pub async fn get_log(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<Revision>>, (StatusCode, Json<ErrorResponse>)> {
    let start = RevisionRef::from_raw(query.s);
    let end = RevisionRef::from_raw(query.e);
    let limit = LogLimit::from_raw(query.l);
    debug!(%start, %end, ?limit, "Log request");

    state
        .log_source
        .log(start, end, limit)
        .await
        .map(Json)
        .map_err(|e| {
            warn!("Log request failed: {}", e);
            let code = match e {
                SourceError::Unavailable(_) => "SOURCE_UNAVAILABLE",
                SourceError::Malformed(_) => "SOURCE_MALFORMED",
            };
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse::new(e.to_string(), code)),
            )
        })
}
