//! Mesh computation and retrieval endpoints.
//!
//! # Design
//! - Computation endpoints pass the remote engine's answer through: its status
//!   code and body reach the client unchanged.
//! - Peer failures without an answer (timeout, unreachable, undecodable) are
//!   problem documents with 504/502.

use std::io;
use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use radmesh_core::{
    ComputationOutcome, MeshDispatch, MeshJob, PipelineError, RegionName, ResponseBody,
};
use radmesh_fsops::MeshName;
use tracing::{debug, info};

use crate::http::constants::CONTENT_TYPE_OBJ;
use crate::http::errors::ApiError;
use crate::models::{CalculateRoiRequest, MakeMeshRequest, RoiMeshQuery};
use crate::state::ApiState;

pub(crate) async fn make_mesh(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<MakeMeshRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::from_json_rejection(&rejection))?;
    let job = MeshJob::from_params(request.mesh_type, &request.mesh_params)
        .map_err(|err| ApiError::from_pipeline(&err.into()))?;
    run_job(&state, job).await
}

pub(crate) async fn calculate_roi(
    State(state): State<Arc<ApiState>>,
    Path(mesh_name): Path<String>,
    payload: Result<Json<CalculateRoiRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::from_json_rejection(&rejection))?;
    let mesh_name = parse_mesh_name(&mesh_name)?;
    let region = parse_region(&request.roi_name)?;
    run_job(&state, MeshJob::Roi { mesh_name, region }).await
}

pub(crate) async fn fetch_roi_mesh(
    State(state): State<Arc<ApiState>>,
    Path(mesh_name): Path<String>,
    Query(query): Query<RoiMeshQuery>,
) -> Result<Response, ApiError> {
    let mesh_name = parse_mesh_name(&mesh_name)?;
    let region = parse_region(&query.roi_name)?;
    let path = state
        .workflow
        .roi_mesh_path(&mesh_name, &region, query.variant);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(mesh_name = %mesh_name, roi_name = %region, "roi mesh not computed");
            return Err(ApiError::not_found("mesh has not been computed")
                .with_invalid_param("roiName", region.as_str()));
        }
        Err(err) => {
            return Err(ApiError::internal("failed to read mesh file")
                .with_invalid_param("path", format!("{}: {err}", path.display())));
        }
    };
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, CONTENT_TYPE_OBJ)
        .body(Body::from(bytes))
        .map_err(|_| ApiError::internal("failed to build mesh response"))
}

async fn run_job(state: &ApiState, job: MeshJob) -> Result<Response, ApiError> {
    let dispatch = state
        .workflow
        .make_mesh(job)
        .await
        .map_err(|err| ApiError::from_pipeline(&err))?;
    info!(
        mesh_type = dispatch.kind.as_str(),
        outcome = dispatch.outcome.label(),
        attempts = dispatch.attempts,
        "mesh request finished"
    );
    passthrough(&dispatch)
}

/// Render a dispatch the way the remote engine answered it.
pub(crate) fn passthrough(dispatch: &MeshDispatch) -> Result<Response, ApiError> {
    match &dispatch.outcome {
        ComputationOutcome::Completed { status, body } => {
            let status = remote_status(*status);
            Ok(match body {
                None => status.into_response(),
                Some(ResponseBody::Json(value)) => (status, Json(value.clone())).into_response(),
                Some(ResponseBody::Text(text)) => (status, text.clone()).into_response(),
                Some(ResponseBody::Binary {
                    content_type,
                    bytes,
                }) => (
                    status,
                    [(CONTENT_TYPE, content_type.clone())],
                    bytes.clone(),
                )
                    .into_response(),
            })
        }
        ComputationOutcome::Rejected { status, body } => Ok((
            remote_status(*status),
            body.clone().unwrap_or_default(),
        )
            .into_response()),
        other => Err(PipelineError::from_outcome(other, dispatch.attempts).map_or_else(
            || ApiError::internal("remote outcome could not be classified"),
            |err| ApiError::from_pipeline(&err),
        )),
    }
}

fn remote_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
}

fn parse_mesh_name(value: &str) -> Result<MeshName, ApiError> {
    MeshName::parse(value).map_err(|_| {
        ApiError::bad_request("invalid workspace name").with_invalid_param("meshName", value)
    })
}

fn parse_region(value: &str) -> Result<RegionName, ApiError> {
    RegionName::parse(value).map_err(|err| ApiError::from_pipeline(&err.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use radmesh_core::MeshKind;
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;

    fn dispatch(outcome: ComputationOutcome) -> MeshDispatch {
        MeshDispatch {
            kind: MeshKind::Ct,
            save_to: PathBuf::from("/u/CT/plan42/plan42.obj"),
            outcome,
            attempts: 1,
        }
    }

    #[test]
    fn remote_answers_keep_their_status() -> anyhow::Result<()> {
        let ok = passthrough(&dispatch(ComputationOutcome::Completed {
            status: 200,
            body: Some(ResponseBody::Json(json!({"saved": true}))),
        }))
        .map_err(|err| anyhow::anyhow!("{err:?}"))?;
        assert_eq!(ok.status(), StatusCode::OK);

        let failed = passthrough(&dispatch(ComputationOutcome::Rejected {
            status: 500,
            body: Some("mesh failed".into()),
        }))
        .map_err(|err| anyhow::anyhow!("{err:?}"))?;
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        Ok(())
    }

    #[test]
    fn silent_peers_become_gateway_problems() {
        let timed_out = passthrough(&dispatch(ComputationOutcome::TimedOut {
            after: Duration::from_secs(1),
        }));
        assert!(matches!(
            timed_out,
            Err(ref err) if err.status() == StatusCode::GATEWAY_TIMEOUT
        ));

        let unreachable = passthrough(&dispatch(ComputationOutcome::Unreachable {
            detail: "connection refused".into(),
        }));
        assert!(matches!(
            unreachable,
            Err(ref err) if err.status() == StatusCode::BAD_GATEWAY
        ));
    }
}
