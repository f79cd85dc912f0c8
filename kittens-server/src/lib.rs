//! kittens-server - HTTP and WebSocket server for the kittens tracker
//!
//! The server holds a [`ModelHandle`](kittens_core::ModelHandle) and exposes:
//!
//! - `/atl/str` - subscriber WebSocket: a `connect` snapshot followed by one
//!   `change` frame per newly recorded revision
//! - `/api/log` - raw log pass-through to the configured log source
//! - `/api/health` and `/api/update` - status and manual update trigger
//!
//! Anything else is served from an optional static directory.

mod error;
pub mod http;
mod state;
pub mod ws;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use error::ServerError;
pub use http::create_router;
pub use state::AppState;

/// Default listening port
pub const DEFAULT_PORT: u16 = 6565;

/// The kittens HTTP server
pub struct KittensServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl KittensServer {
    pub fn new(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shared application state
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Run the server, binding to the configured address
    ///
    /// Returns once `shutdown` is cancelled and in-flight requests finish.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ServerError> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: e,
            })?;

        self.run_with_listener(listener, shutdown).await
    }

    /// Run the server on an already bound listener
    pub async fn run_with_listener(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!("kittens server listening on {}", addr);
        if let Some(dir) = &self.config.public_dir {
            tracing::info!(dir = %dir.display(), "Serving static files");
        }

        let router = create_router(self.state, self.config.public_dir.as_deref());
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        tracing::info!("kittens server stopped");
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Directory served for paths no route matches
    pub public_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            public_dir: None,
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig with the specified host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            public_dir: None,
        }
    }

    #[must_use]
    pub fn with_public_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.public_dir = Some(dir.into());
        self
    }

    /// Returns the socket address string (e.g., "127.0.0.1:6565")
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 6565);
        assert!(config.public_dir.is_none());
    }

    #[test]
    fn test_server_config_addr() {
        let config = ServerConfig::new("0.0.0.0", 8080);
        assert_eq!(config.addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_server_config_public_dir() {
        let config = ServerConfig::default().with_public_dir("/srv/kittens");
        assert_eq!(config.public_dir, Some(PathBuf::from("/srv/kittens")));
    }
}
