//! RFC9457-style API error wrapper.

use axum::{
    Json,
    extract::multipart::MultipartError,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use radmesh_core::PipelineError;

use crate::http::constants::{
    PROBLEM_BAD_REQUEST, PROBLEM_INTERNAL, PROBLEM_NOT_FOUND, PROBLEM_PAYLOAD_TOO_LARGE,
    PROBLEM_REMOTE_FAILURE, PROBLEM_REMOTE_TIMEOUT, PROBLEM_UNPROCESSABLE,
};
use crate::models::{ProblemDetails, ProblemInvalidParam};

/// Structured API error with optional RFC9457 fields.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    kind: &'static str,
    title: &'static str,
    detail: Option<String>,
    error_kind: Option<&'static str>,
    invalid_params: Option<Vec<ProblemInvalidParam>>,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, title: &'static str) -> Self {
        Self {
            status,
            kind,
            title,
            detail: None,
            error_kind: None,
            invalid_params: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn with_invalid_param(
        mut self,
        pointer: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.invalid_params
            .get_or_insert_with(Vec::new)
            .push(ProblemInvalidParam {
                pointer: pointer.into(),
                message: message.into(),
            });
        self
    }

    const fn with_error_kind(mut self, error_kind: &'static str) -> Self {
        self.error_kind = Some(error_kind);
        self
    }

    pub(crate) fn internal(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_INTERNAL,
            "internal server error",
        )
        .with_detail(detail)
    }

    pub(crate) fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROBLEM_BAD_REQUEST, "bad request").with_detail(detail)
    }

    pub(crate) fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, PROBLEM_NOT_FOUND, "resource not found")
            .with_detail(detail)
    }

    pub(crate) fn payload_too_large(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            PROBLEM_PAYLOAD_TOO_LARGE,
            "payload too large",
        )
        .with_detail(detail)
    }

    pub(crate) fn from_json_rejection(rejection: &JsonRejection) -> Self {
        Self::bad_request("request body is not valid JSON for this endpoint")
            .with_invalid_param("body", rejection.body_text())
    }

    pub(crate) fn from_multipart(error: &MultipartError) -> Self {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::payload_too_large("upload exceeds the configured size limit")
        } else {
            Self::bad_request("malformed multipart body").with_invalid_param("body", error.body_text())
        }
    }

    /// Problem document for a pipeline failure.
    pub(crate) fn from_pipeline(error: &PipelineError) -> Self {
        let status = pipeline_status(error);
        let (kind, title) = match error {
            PipelineError::RemoteTimeout { .. } => {
                (PROBLEM_REMOTE_TIMEOUT, "remote computation timed out")
            }
            PipelineError::RemoteError { .. }
            | PipelineError::RemoteUnavailable { .. }
            | PipelineError::MalformedRemoteResponse { .. } => {
                (PROBLEM_REMOTE_FAILURE, "remote computation failed")
            }
            PipelineError::UnknownWorkspace { .. } => (PROBLEM_NOT_FOUND, "resource not found"),
            PipelineError::OversizedArchive { .. } => {
                (PROBLEM_PAYLOAD_TOO_LARGE, "payload too large")
            }
            PipelineError::ValidationFailed { .. }
            | PipelineError::MissingWorkspaceFile { .. }
            | PipelineError::UnreadableStructureSet { .. } => {
                (PROBLEM_UNPROCESSABLE, "unprocessable workspace")
            }
            PipelineError::Io { .. } => (PROBLEM_INTERNAL, "internal server error"),
            PipelineError::InvalidArchiveName { .. }
            | PipelineError::CorruptArchive { .. }
            | PipelineError::PathTraversalAttempt { .. }
            | PipelineError::InvalidRegionName { .. }
            | PipelineError::InvalidMeshParams { .. } => (PROBLEM_BAD_REQUEST, "bad request"),
        };
        let base = Self::new(status, kind, title)
            .with_detail(error.to_string())
            .with_error_kind(error.kind());
        match error {
            PipelineError::ValidationFailed { invalid_entries } => invalid_entries
                .iter()
                .fold(base, |acc, entry| acc.with_invalid_param(entry.clone(), "not a DICOM file name")),
            PipelineError::UnknownWorkspace { mesh_name } => {
                base.with_invalid_param("meshName", mesh_name.clone())
            }
            PipelineError::InvalidRegionName { reason, .. } => {
                base.with_invalid_param("roiName", *reason)
            }
            PipelineError::InvalidMeshParams { reason, .. } => {
                base.with_invalid_param("mesh_params", *reason)
            }
            PipelineError::MissingWorkspaceFile { path } => {
                base.with_invalid_param("workspace", path.display().to_string())
            }
            _ => base,
        }
    }

    #[cfg(test)]
    pub(crate) const fn status(&self) -> StatusCode {
        self.status
    }

    #[cfg(test)]
    pub(crate) const fn error_kind(&self) -> Option<&'static str> {
        self.error_kind
    }
}

/// HTTP status for a pipeline failure. Remote statuses pass through verbatim.
pub(crate) fn pipeline_status(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::InvalidArchiveName { .. }
        | PipelineError::CorruptArchive { .. }
        | PipelineError::PathTraversalAttempt { .. }
        | PipelineError::InvalidRegionName { .. }
        | PipelineError::InvalidMeshParams { .. } => StatusCode::BAD_REQUEST,
        PipelineError::OversizedArchive { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        PipelineError::ValidationFailed { .. }
        | PipelineError::MissingWorkspaceFile { .. }
        | PipelineError::UnreadableStructureSet { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::UnknownWorkspace { .. } => StatusCode::NOT_FOUND,
        PipelineError::RemoteError { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        PipelineError::RemoteTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        PipelineError::RemoteUnavailable { .. } | PipelineError::MalformedRemoteResponse { .. } => {
            StatusCode::BAD_GATEWAY
        }
        PipelineError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ProblemDetails {
            kind: self.kind.to_string(),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
            error_kind: self.error_kind.map(str::to_string),
            invalid_params: self.invalid_params,
        };
        (self.status, Json(body)).into_response()
    }
}
