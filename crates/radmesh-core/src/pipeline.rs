//! Upload pipeline vocabulary: stages, failures, and the terminal result.
//!
//! # Design
//! - `PipelineError` is the single taxonomy callers see; lower-layer errors are
//!   folded into it with their structured context intact.
//! - `UploadOutcome` is always produced, on success and on failure, so the
//!   transport never has to improvise a response shape.

use std::path::PathBuf;
use std::time::Duration;

use radmesh_fsops::{ArchiveLimit, FsOpsError, MeshName};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::CoreError;
use crate::model::MeshKind;
use crate::outcome::ComputationOutcome;

/// Failures surfaced by the upload and mesh workflows.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The archive filename cannot become a workspace name.
    #[error("invalid archive name")]
    InvalidArchiveName {
        /// Static reason for the rejection.
        reason: &'static str,
        /// Offending name.
        value: String,
    },
    /// The archive or one of its entries is unreadable.
    #[error("corrupt archive")]
    CorruptArchive {
        /// Underlying unpack failure.
        #[source]
        source: FsOpsError,
    },
    /// A configured archive ceiling was exceeded.
    #[error("archive exceeds configured limits")]
    OversizedArchive {
        /// Ceiling that was hit.
        limit: ArchiveLimit,
        /// Configured maximum.
        allowed: u64,
        /// Observed value.
        observed: u64,
    },
    /// An entry would be written outside the workspace.
    #[error("archive entry escapes the workspace")]
    PathTraversalAttempt {
        /// Raw entry name.
        entry: String,
    },
    /// The archive holds files that are not DICOM-named.
    #[error("archive failed validation")]
    ValidationFailed {
        /// Every offending workspace-relative path.
        invalid_entries: Vec<String>,
    },
    /// A required input is missing from the workspace.
    #[error("workspace file missing")]
    MissingWorkspaceFile {
        /// Expected location.
        path: PathBuf,
    },
    /// A region name is blank or unsafe.
    #[error("invalid region name")]
    InvalidRegionName {
        /// Static reason for the rejection.
        reason: &'static str,
        /// Offending value.
        value: String,
    },
    /// `mesh_type` / `mesh_params` are inconsistent.
    #[error("invalid mesh parameters")]
    InvalidMeshParams {
        /// Static reason for the rejection.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// No workspace exists with the requested name.
    #[error("unknown workspace")]
    UnknownWorkspace {
        /// Requested name.
        mesh_name: String,
    },
    /// The remote engine did not answer in time.
    #[error("remote computation timed out")]
    RemoteTimeout {
        /// Bound that elapsed.
        after: Duration,
    },
    /// The remote engine answered with a non-success status.
    #[error("remote computation failed")]
    RemoteError {
        /// Status returned by the engine.
        status: u16,
        /// Body returned by the engine.
        body: Option<String>,
    },
    /// The remote engine could not be reached.
    #[error("remote computation unavailable")]
    RemoteUnavailable {
        /// Transport error message from the last attempt.
        detail: String,
        /// Attempts made.
        attempts: u32,
    },
    /// The remote engine answered with an undecodable body.
    #[error("remote response malformed")]
    MalformedRemoteResponse {
        /// Status returned by the engine.
        status: u16,
        /// Decoder message.
        detail: String,
    },
    /// The structure set could not be read.
    #[error("unreadable structure set")]
    UnreadableStructureSet {
        /// Underlying catalog error.
        #[source]
        source: CoreError,
    },
    /// Ambient filesystem failure.
    #[error("pipeline io failure")]
    Io {
        /// Underlying filesystem error.
        #[source]
        source: FsOpsError,
    },
}

/// Convenience alias for pipeline results.
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Stable machine-readable identifier.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArchiveName { .. } => "invalid_archive_name",
            Self::CorruptArchive { .. } => "corrupt_archive",
            Self::OversizedArchive { .. } => "oversized_archive",
            Self::PathTraversalAttempt { .. } => "path_traversal_attempt",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::MissingWorkspaceFile { .. } => "missing_workspace_file",
            Self::InvalidRegionName { .. } => "invalid_region_name",
            Self::InvalidMeshParams { .. } => "invalid_mesh_params",
            Self::UnknownWorkspace { .. } => "unknown_workspace",
            Self::RemoteTimeout { .. } => "remote_timeout",
            Self::RemoteError { .. } => "remote_error",
            Self::RemoteUnavailable { .. } => "remote_unavailable",
            Self::MalformedRemoteResponse { .. } => "malformed_remote_response",
            Self::UnreadableStructureSet { .. } => "unreadable_structure_set",
            Self::Io { .. } => "io",
        }
    }

    /// Map a non-success remote outcome onto the taxonomy.
    ///
    /// Returns `None` for [`ComputationOutcome::Completed`].
    #[must_use]
    pub fn from_outcome(outcome: &ComputationOutcome, attempts: u32) -> Option<Self> {
        match outcome {
            ComputationOutcome::Completed { .. } => None,
            ComputationOutcome::Rejected { status, body } => Some(Self::RemoteError {
                status: *status,
                body: body.clone(),
            }),
            ComputationOutcome::MalformedResponse { status, detail } => {
                Some(Self::MalformedRemoteResponse {
                    status: *status,
                    detail: detail.clone(),
                })
            }
            ComputationOutcome::Unreachable { detail } => Some(Self::RemoteUnavailable {
                detail: detail.clone(),
                attempts,
            }),
            ComputationOutcome::TimedOut { after } => Some(Self::RemoteTimeout { after: *after }),
        }
    }
}

impl From<FsOpsError> for PipelineError {
    fn from(error: FsOpsError) -> Self {
        match error {
            FsOpsError::InvalidArchiveName { reason, value } => {
                Self::InvalidArchiveName { reason, value }
            }
            FsOpsError::OversizedArchive {
                limit,
                allowed,
                observed,
            } => Self::OversizedArchive {
                limit,
                allowed,
                observed,
            },
            FsOpsError::PathTraversalAttempt { entry } => Self::PathTraversalAttempt { entry },
            FsOpsError::MissingWorkspaceFile { path } => Self::MissingWorkspaceFile { path },
            corrupt @ FsOpsError::CorruptArchive { .. } => Self::CorruptArchive { source: corrupt },
            other => Self::Io { source: other },
        }
    }
}

impl From<CoreError> for PipelineError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::InvalidRegionName { reason, value } => {
                Self::InvalidRegionName { reason, value }
            }
            CoreError::InvalidMeshParams { reason, value } => {
                Self::InvalidMeshParams { reason, value }
            }
            unreadable @ CoreError::UnreadableStructureSet { .. } => {
                Self::UnreadableStructureSet { source: unreadable }
            }
        }
    }
}

/// Last stage an upload reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Body received; nothing extracted.
    Received,
    /// Extracted into the workspace.
    Unpacked,
    /// Naming policy satisfied (or waived).
    Validated,
    /// Naming policy failed; workspace removed.
    Rejected,
    /// Computation sent to the remote engine.
    Dispatched,
}

impl PipelineStage {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Unpacked => "unpacked",
            Self::Validated => "validated",
            Self::Rejected => "rejected",
            Self::Dispatched => "dispatched",
        }
    }
}

/// Overall upload verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Every requested stage succeeded.
    Success,
    /// Some stage failed.
    Failure,
}

/// Caller-selected upload behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Dispatch a CT mesh once the archive validates.
    pub start_computation: bool,
}

/// Summary of one remote dispatch embedded in responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputationSummary {
    /// `CT` or `ROI`.
    pub mesh_type: &'static str,
    /// Remote endpoint.
    pub endpoint: &'static str,
    /// Outcome label.
    pub outcome: &'static str,
    /// Remote status when the peer answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Remote body when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Output the engine was asked to write.
    pub save_to: PathBuf,
    /// Attempts made.
    pub attempts: u32,
}

/// One finished mesh dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDispatch {
    /// CT or ROI.
    pub kind: MeshKind,
    /// Output the engine was asked to write.
    pub save_to: PathBuf,
    /// Final remote outcome.
    pub outcome: ComputationOutcome,
    /// Attempts made.
    pub attempts: u32,
}

impl MeshDispatch {
    /// Response-friendly view of this dispatch.
    #[must_use]
    pub fn summary(&self) -> ComputationSummary {
        ComputationSummary {
            mesh_type: self.kind.as_str(),
            endpoint: self.kind.endpoint(),
            outcome: self.outcome.label(),
            status: self.outcome.status(),
            body: self.outcome.body_json(),
            save_to: self.save_to.clone(),
            attempts: self.attempts,
        }
    }
}

/// Terminal, structured result of one upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    /// Overall verdict.
    pub status: OutcomeStatus,
    /// Human-readable summary.
    pub message: String,
    /// Last stage reached.
    pub stage: PipelineStage,
    /// Workspace name when one could be derived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh_name: Option<MeshName>,
    /// Workspace directory, or the workspace root when none was created.
    pub path_absolute: PathBuf,
    /// Offending entries reported by validation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invalid_entries: Vec<String>,
    /// Non-fatal findings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Remote dispatch, when one ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computation: Option<ComputationSummary>,
    /// Machine-readable failure identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    /// Failure behind a `Failure` status.
    #[serde(skip)]
    pub error: Option<PipelineError>,
}

impl UploadOutcome {
    /// Successful upload.
    #[must_use]
    pub fn success(stage: PipelineStage, mesh_name: MeshName, path: PathBuf) -> Self {
        Self {
            status: OutcomeStatus::Success,
            message: "files saved to path".to_string(),
            stage,
            mesh_name: Some(mesh_name),
            path_absolute: path,
            invalid_entries: Vec::new(),
            warnings: Vec::new(),
            computation: None,
            error_kind: None,
            error: None,
        }
    }

    /// Failed upload; validation offenders are lifted into `invalid_entries`.
    #[must_use]
    pub fn failure(
        stage: PipelineStage,
        mesh_name: Option<MeshName>,
        path: PathBuf,
        error: PipelineError,
    ) -> Self {
        let invalid_entries = match &error {
            PipelineError::ValidationFailed { invalid_entries } => invalid_entries.clone(),
            _ => Vec::new(),
        };
        Self {
            status: OutcomeStatus::Failure,
            message: error.to_string(),
            stage,
            mesh_name,
            path_absolute: path,
            invalid_entries,
            warnings: Vec::new(),
            computation: None,
            error_kind: Some(error.kind()),
            error: Some(error),
        }
    }

    /// Attach warnings.
    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Attach a dispatch summary.
    #[must_use]
    pub fn with_computation(mut self, computation: ComputationSummary) -> Self {
        self.computation = Some(computation);
        self
    }

    /// True when the upload succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::ResponseBody;
    use serde_json::json;

    #[test]
    fn fsops_errors_keep_their_context() {
        let traversal: PipelineError = FsOpsError::PathTraversalAttempt {
            entry: "../../etc/passwd".into(),
        }
        .into();
        assert_eq!(traversal.kind(), "path_traversal_attempt");

        let name: PipelineError = FsOpsError::InvalidArchiveName {
            reason: "empty",
            value: String::new(),
        }
        .into();
        assert!(matches!(
            name,
            PipelineError::InvalidArchiveName { reason: "empty", .. }
        ));

        let io: PipelineError = FsOpsError::Io {
            operation: "test",
            path: "x".into(),
            source: std::io::Error::other("disk"),
        }
        .into();
        assert_eq!(io.kind(), "io");
    }

    #[test]
    fn remote_outcomes_map_verbatim() {
        let rejected = ComputationOutcome::Rejected {
            status: 503,
            body: Some("busy".into()),
        };
        assert!(matches!(
            PipelineError::from_outcome(&rejected, 1),
            Some(PipelineError::RemoteError { status: 503, .. })
        ));
        let completed = ComputationOutcome::Completed {
            status: 200,
            body: Some(ResponseBody::Text("ok".into())),
        };
        assert!(PipelineError::from_outcome(&completed, 1).is_none());
        assert!(matches!(
            PipelineError::from_outcome(
                &ComputationOutcome::Unreachable {
                    detail: "refused".into()
                },
                3
            ),
            Some(PipelineError::RemoteUnavailable { attempts: 3, .. })
        ));
    }

    #[test]
    fn validation_failure_renders_offenders() -> anyhow::Result<()> {
        let outcome = UploadOutcome::failure(
            PipelineStage::Rejected,
            Some(MeshName::parse("plan42")?),
            PathBuf::from("/up/dicoms"),
            PipelineError::ValidationFailed {
                invalid_entries: vec!["notes.txt".into()],
            },
        );
        assert!(!outcome.is_success());
        assert_eq!(
            serde_json::to_value(&outcome)?,
            json!({
                "status": "failure",
                "message": "archive failed validation",
                "stage": "rejected",
                "meshName": "plan42",
                "pathAbsolute": "/up/dicoms",
                "invalidEntries": ["notes.txt"],
                "errorKind": "validation_failed",
            })
        );
        Ok(())
    }
}
