//! Server error types

use thiserror::Error;

/// Errors that stop the kittens server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The listener failed after it was bound
    #[error("server stopped unexpectedly: {0}")]
    Serve(#[from] std::io::Error),
}
