//! # Design
//!
//! - Structured, constant-message errors for archive intake and workspace access.
//! - Offending names, paths, and limits live in fields so callers can report them verbatim.
//! - Source errors are preserved without interpolating context into messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use zip::result::ZipError;

/// Result type for filesystem operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Which archive ceiling was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveLimit {
    /// Number of entries in the archive.
    Entries,
    /// Uncompressed bytes declared by the archive directory.
    DeclaredBytes,
    /// Uncompressed bytes actually written during extraction.
    WrittenBytes,
}

impl ArchiveLimit {
    /// Stable identifier used in logs and responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entries => "entries",
            Self::DeclaredBytes => "declared_bytes",
            Self::WrittenBytes => "written_bytes",
        }
    }
}

/// Errors produced while accepting, unpacking, and inspecting workspaces.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// The declared archive filename cannot become a workspace name.
    #[error("invalid archive name")]
    InvalidArchiveName {
        /// Static reason for the rejection.
        reason: &'static str,
        /// Offending name.
        value: String,
    },
    /// The archive could not be opened or one of its entries could not be read.
    #[error("corrupt archive")]
    CorruptArchive {
        /// Operation that failed.
        operation: &'static str,
        /// Entry being read when the failure happened.
        entry: Option<String>,
        /// Underlying zip error.
        source: ZipError,
    },
    /// A configured ceiling was exceeded.
    #[error("archive exceeds configured limits")]
    OversizedArchive {
        /// Ceiling that was hit.
        limit: ArchiveLimit,
        /// Configured maximum.
        allowed: u64,
        /// Observed value when the ceiling was hit.
        observed: u64,
    },
    /// An entry would be written outside the workspace.
    #[error("archive entry escapes the workspace")]
    PathTraversalAttempt {
        /// Raw entry name as stored in the archive.
        entry: String,
    },
    /// A file the caller needs is absent from the workspace.
    #[error("workspace file missing")]
    MissingWorkspaceFile {
        /// Expected location.
        path: PathBuf,
    },
    /// IO failures while interacting with the filesystem.
    #[error("fsops io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Walkdir traversal failures.
    #[error("fsops walkdir failure")]
    Walkdir {
        /// Path involved in the walkdir failure.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// The DICOM name pattern failed to compile.
    #[error("fsops pattern failure")]
    Pattern {
        /// Underlying regex error.
        source: regex::Error,
    },
    /// A blocking task was cancelled or panicked.
    #[error("fsops blocking task failed")]
    Blocking {
        /// Operation that ran on the blocking pool.
        operation: &'static str,
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
}

impl FsOpsError {
    /// Builds an [`FsOpsError::Io`] for `operation` on `path`.
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) const fn corrupt(
        operation: &'static str,
        entry: Option<String>,
        source: ZipError,
    ) -> Self {
        Self::CorruptArchive {
            operation,
            entry,
            source,
        }
    }

    pub(crate) const fn oversized(limit: ArchiveLimit, allowed: u64, observed: u64) -> Self {
        Self::OversizedArchive {
            limit,
            allowed,
            observed,
        }
    }

    pub(crate) fn walkdir(path: impl Into<PathBuf>, source: walkdir::Error) -> Self {
        Self::Walkdir {
            path: path.into(),
            source,
        }
    }
}
