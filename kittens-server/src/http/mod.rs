//! HTTP server module

mod api;
mod log;

use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;

use crate::AppState;
use crate::ws;

pub use api::{ErrorResponse, HealthResponse};
pub use log::{DEFAULT_LOG_LIMIT, LogQuery};

/// Create the HTTP router with all routes configured
///
/// Paths no route matches are served from `public_dir` when one is given.
pub fn create_router(state: Arc<AppState>, public_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/api/health", get(api::health))
        .route("/api/update", post(api::update))
        .route("/api/log", get(log::get_log))
        .layer(CompressionLayer::new());

    let router = Router::new()
        .route("/atl/str", get(ws::subscriber_ws))
        .merge(api)
        .with_state(state);

    match public_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}
