//! # Design
//!
//! - Only construction can fail; dispatch reports through `ComputationOutcome`.

use thiserror::Error;

/// Result type for remote client construction.
pub type GenieResult<T> = Result<T, GenieError>;

/// Errors raised while preparing the remote mesh client.
#[derive(Debug, Error)]
pub enum GenieError {
    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client")]
    ClientBuild {
        /// Source error from reqwest.
        #[source]
        source: reqwest::Error,
    },
    /// The configured base URL cannot carry endpoint paths.
    #[error("remote base URL cannot be used as a base")]
    BaseUrl {
        /// Offending URL.
        value: String,
    },
    /// Joining an endpoint onto the base URL failed.
    #[error("invalid remote endpoint")]
    Endpoint {
        /// Endpoint being joined.
        endpoint: &'static str,
        /// Source parse error.
        #[source]
        source: url::ParseError,
    },
}
