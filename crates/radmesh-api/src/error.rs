//! # Design
//!
//! - Server lifecycle failures only; request failures are problem documents.
//! - Constant messages with the address kept as a field.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Result alias for API server operations.
pub type ApiServerResult<T> = Result<T, ApiServerError>;

/// Errors raised while binding or serving the API.
#[derive(Debug, Error)]
pub enum ApiServerError {
    /// The listener could not be bound.
    #[error("failed to bind api listener")]
    Bind {
        /// Configured `RADMESH_BIND_ADDR:RADMESH_HTTP_PORT`.
        addr: SocketAddr,
        /// Underlying IO error.
        source: io::Error,
    },
    /// `axum::serve` returned.
    #[error("api server terminated unexpectedly")]
    Serve {
        /// Underlying IO error.
        source: io::Error,
    },
}
