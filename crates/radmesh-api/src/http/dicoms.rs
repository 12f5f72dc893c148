//! Workspace and region listings.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use radmesh_fsops::MeshName;

use crate::http::errors::ApiError;
use crate::models::{MeshesResponse, RegionsResponse};
use crate::state::ApiState;

pub(crate) async fn list_meshes(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<MeshesResponse>, ApiError> {
    let names = state
        .workflow
        .list_workspaces()
        .await
        .map_err(|err| ApiError::from_pipeline(&err))?;
    Ok(Json(MeshesResponse {
        meshes_names: names.iter().map(|name| name.as_str().to_string()).collect(),
    }))
}

pub(crate) async fn list_regions(
    State(state): State<Arc<ApiState>>,
    Path(dicom_name): Path<String>,
) -> Result<Json<RegionsResponse>, ApiError> {
    let mesh_name = MeshName::parse(&dicom_name).map_err(|_| {
        ApiError::bad_request("invalid workspace name").with_invalid_param("dicomName", dicom_name)
    })?;
    let regions = state
        .workflow
        .list_regions(&mesh_name)
        .await
        .map_err(|err| ApiError::from_pipeline(&err))?;
    Ok(Json(RegionsResponse {
        roi_names: regions.iter().map(|region| region.as_str().to_string()).collect(),
    }))
}
