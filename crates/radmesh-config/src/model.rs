//! Typed configuration handed to the orchestrator and API at construction.
//!
//! # Design
//! - One immutable snapshot per process; nothing here is global or mutable.
//! - Path helpers live next to the fields they derive from.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::defaults;

/// Complete service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshConfig {
    /// On-disk layout roots.
    pub storage: StorageConfig,
    /// Remote computation peer settings.
    pub remote: RemoteConfig,
    /// Ceilings applied to uploaded archives.
    pub limits: ArchiveLimits,
    /// Archive content validation policy.
    pub validation: ValidationConfig,
    /// HTTP listener settings.
    pub http: HttpConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Roots of the persisted filesystem layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Base directory for every artifact the service writes.
    pub upload_dir: PathBuf,
    /// Workspace directory name under `upload_dir`.
    pub dicoms_dir: String,
    /// ROI mesh directory name under `upload_dir`.
    pub roi_dir: String,
    /// CT mesh directory name under `upload_dir`.
    pub ct_dir: String,
}

impl StorageConfig {
    /// Storage rooted at `upload_dir` using the default sub-directory names.
    #[must_use]
    pub fn with_upload_dir(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            dicoms_dir: defaults::DICOMS_DIR.to_string(),
            roi_dir: defaults::ROI_DIR.to_string(),
            ct_dir: defaults::CT_DIR.to_string(),
        }
    }

    /// `UPLOAD_DIR/DICOMS_DIR`.
    #[must_use]
    pub fn dicoms_root(&self) -> PathBuf {
        self.upload_dir.join(&self.dicoms_dir)
    }

    /// `UPLOAD_DIR/ROI`.
    #[must_use]
    pub fn roi_root(&self) -> PathBuf {
        self.upload_dir.join(&self.roi_dir)
    }

    /// `UPLOAD_DIR/CT`.
    #[must_use]
    pub fn ct_root(&self) -> PathBuf {
        self.upload_dir.join(&self.ct_dir)
    }
}

/// Settings for the remote mesh engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Base URL that `MakeCtMesh` / `MakeRoiMesh` are resolved against.
    pub base_url: Url,
    /// Upper bound for one remote round trip.
    pub timeout: Duration,
    /// Total attempts made when the peer is unreachable.
    pub max_attempts: u32,
}

/// Size ceilings for uploaded archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveLimits {
    /// Maximum number of entries in one archive.
    pub max_entries: usize,
    /// Maximum total uncompressed bytes extracted from one archive.
    pub max_total_bytes: u64,
    /// Maximum accepted HTTP request body.
    pub max_upload_bytes: usize,
    /// Uploads above this size spill from memory to a temporary file.
    pub spool_threshold_bytes: usize,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entries: defaults::MAX_ARCHIVE_ENTRIES,
            max_total_bytes: defaults::MAX_ARCHIVE_BYTES,
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
            spool_threshold_bytes: defaults::SPOOL_THRESHOLD_BYTES,
        }
    }
}

/// What the orchestrator does when an archive contains non-DICOM names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidEntryPolicy {
    /// Remove the workspace and fail the upload.
    #[default]
    Reject,
    /// Keep the workspace and report offending entries as warnings.
    Warn,
}

impl InvalidEntryPolicy {
    /// Stable string representation used in logs and env values.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::Warn => "warn",
        }
    }

    /// Parse the env representation (`reject` / `warn`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reject" => Some(Self::Reject),
            "warn" => Some(Self::Warn),
            _ => None,
        }
    }
}

/// Archive content validation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationConfig {
    /// Policy applied to archives with invalid entries.
    pub on_invalid: InvalidEntryPolicy,
    /// Match the `.dcm` suffix case-insensitively.
    pub case_insensitive: bool,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    /// Interface to bind.
    pub bind_addr: IpAddr,
    /// Port to bind.
    pub port: u16,
}

impl HttpConfig {
    /// Socket address assembled from the bind address and port.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::from([127, 0, 0, 1]),
            port: defaults::HTTP_PORT,
        }
    }
}

/// Logging settings; the format is resolved by the telemetry crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// `json` or `pretty`; inferred from the build profile when absent.
    pub format: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            format: None,
        }
    }
}
