//! Archive upload endpoints.
//!
//! # Design
//! - The archive part is streamed chunk by chunk into a spooled buffer; it is
//!   never collected into one allocation by the handler.
//! - The workflow always answers with an `UploadOutcome`; the handler only picks
//!   the status code for it.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use radmesh_core::UploadOptions;
use radmesh_fsops::UploadedArchive;
use tracing::{info, warn};

use crate::http::constants::{FIELD_FILE, FIELD_FILE_ALIAS, FIELD_START_COMPUTATION};
use crate::http::errors::{ApiError, pipeline_status};
use crate::models::UploadsResponse;
use crate::state::ApiState;

pub(crate) async fn upload_archive(
    State(state): State<Arc<ApiState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut archive: Option<UploadedArchive> = None;
    let mut options = UploadOptions::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::from_multipart(&err))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(FIELD_FILE | FIELD_FILE_ALIAS) => {
                let filename = field
                    .file_name()
                    .map(str::to_owned)
                    .ok_or_else(|| {
                        ApiError::bad_request("archive part has no filename")
                            .with_invalid_param(FIELD_FILE, "missing filename")
                    })?;
                let mut spooled = UploadedArchive::spooled(filename, state.spool_threshold_bytes);
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|err| ApiError::from_multipart(&err))?
                {
                    spooled.append(&chunk).map_err(|err| {
                        warn!(error = %err, "failed to spool upload");
                        ApiError::internal("failed to buffer upload")
                    })?;
                }
                archive = Some(spooled);
            }
            Some(FIELD_START_COMPUTATION) => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| ApiError::from_multipart(&err))?;
                options.start_computation = parse_flag(&value);
            }
            _ => {}
        }
    }

    let archive = archive.ok_or_else(|| {
        ApiError::bad_request("no archive was uploaded")
            .with_invalid_param(FIELD_FILE, "missing multipart file field")
    })?;
    info!(
        filename = archive.declared_filename(),
        bytes = archive.len(),
        spilled = archive.is_spilled(),
        start_computation = options.start_computation,
        "upload received"
    );

    let outcome = state.workflow.upload(archive, options).await;
    let status = outcome
        .error
        .as_ref()
        .map_or(StatusCode::OK, pipeline_status);
    Ok((status, Json(outcome)).into_response())
}

pub(crate) async fn list_uploads(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<UploadsResponse>, ApiError> {
    let listing = state
        .workflow
        .uploads_summary()
        .await
        .map_err(|err| ApiError::from_pipeline(&err))?;
    Ok(Json(UploadsResponse::from(listing)))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
