//! Error types for mesh request construction and structure-set reading.

use std::error::Error;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the mesh domain layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Region name cannot be used to address an ROI mesh.
    #[error("invalid region name")]
    InvalidRegionName {
        /// Static reason for the rejection.
        reason: &'static str,
        /// Offending value.
        value: String,
    },
    /// `mesh_type` / `mesh_params` do not describe a mesh job.
    #[error("invalid mesh parameters")]
    InvalidMeshParams {
        /// Static reason for the rejection.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// The structure-set file is missing or not a structure set.
    #[error("unreadable structure set")]
    UnreadableStructureSet {
        /// File that was read.
        path: PathBuf,
        /// Static reason for the failure.
        reason: &'static str,
        /// Underlying parser failure when available.
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
}

/// Convenience alias for core results.
pub type CoreResult<T> = Result<T, CoreError>;
