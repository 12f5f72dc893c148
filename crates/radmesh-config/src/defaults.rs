//! Default values applied when an environment variable is absent.
//!
//! # Design
//! - Centralize defaults so the loader and tests agree on them.
//! - Keep size ceilings explicit for auditability.

/// Sub-directory of `UPLOAD_DIR` holding unpacked DICOM workspaces.
pub const DICOMS_DIR: &str = "dicoms";
/// Sub-directory of `UPLOAD_DIR` holding computed ROI meshes.
pub const ROI_DIR: &str = "ROI";
/// Sub-directory of `UPLOAD_DIR` holding computed CT meshes.
pub const CT_DIR: &str = "CT";
/// Port of the local Genie peer when neither `GENIE_API` nor `GENIE_PORT` is set.
pub const GENIE_PORT: u16 = 8001;
/// Upper bound on a single remote mesh computation.
pub const REMOTE_TIMEOUT_SECS: u64 = 300;
/// Attempts made against an unreachable peer (1 disables retries).
pub const REMOTE_MAX_ATTEMPTS: u32 = 1;
/// Maximum number of entries accepted in one archive.
pub const MAX_ARCHIVE_ENTRIES: usize = 10_000;
/// Maximum total uncompressed size of one archive.
pub const MAX_ARCHIVE_BYTES: u64 = 2 * 1024 * 1024 * 1024;
/// Maximum size of an upload request body.
pub const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;
/// Uploads larger than this are spooled to a temporary file instead of memory.
pub const SPOOL_THRESHOLD_BYTES: usize = 8 * 1024 * 1024;
/// Default HTTP listener port.
pub const HTTP_PORT: u16 = 5000;
/// Default log level when `RADMESH_LOG_LEVEL` and `RUST_LOG` are unset.
pub const LOG_LEVEL: &str = "info";
