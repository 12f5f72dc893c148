//! Request and response documents for the public HTTP API.
//!
//! Field names follow the wire contract existing clients already speak:
//! camelCase for listings and upload results, snake_case for `MakeMesh`.

use std::path::PathBuf;

use radmesh_core::MeshKind;
use radmesh_fsops::{RoiVariant, UploadsListing};
use serde::{Deserialize, Serialize};

/// RFC9457-compatible problem document surfaced on transport-level failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// Problem type URI.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short summary.
    pub title: String,
    /// HTTP status.
    pub status: u16,
    /// Occurrence-specific explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Stable machine-readable error identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Offending inputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_params: Option<Vec<ProblemInvalidParam>>,
}

/// Invalid parameter pointer surfaced alongside a [`ProblemDetails`] payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemInvalidParam {
    /// JSON pointer or field name.
    pub pointer: String,
    /// What is wrong with it.
    pub message: String,
}

/// `POST /api/MakeMesh` body.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MakeMeshRequest {
    /// `CT` or `ROI`.
    pub mesh_type: MeshKind,
    /// `[meshName]` or `[meshName, roiName]`.
    #[serde(default)]
    pub mesh_params: Vec<String>,
}

/// `POST /api/CalculateRoi/{meshName}` body.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CalculateRoiRequest {
    /// Region to mesh.
    #[serde(alias = "roiName")]
    pub roi_name: String,
}

/// `GET /api/CalculateRoi/{meshName}` query.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RoiMeshQuery {
    /// Region whose mesh is requested.
    #[serde(rename = "roiName", alias = "roi_name")]
    pub roi_name: String,
    /// `hot` or `cold`; the base mesh when absent.
    #[serde(rename = "type", default)]
    pub variant: RoiVariant,
}

/// `GET /api/Upload` body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadsResponse {
    /// Workspace root.
    pub path_absolute: PathBuf,
    /// Number of visible entries.
    pub count: usize,
    /// Visible entries, sorted.
    pub files: Vec<String>,
}

impl From<UploadsListing> for UploadsResponse {
    fn from(listing: UploadsListing) -> Self {
        Self {
            path_absolute: listing.path,
            count: listing.entries.len(),
            files: listing.entries,
        }
    }
}

/// `GET /api/UploadedDicoms` body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MeshesResponse {
    /// Workspace names, sorted.
    pub meshes_names: Vec<String>,
}

/// `GET /api/UploadedDicoms/{dicomName}/regions` body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegionsResponse {
    /// Region names in structure-set order.
    pub roi_names: Vec<String>,
}

/// `GET /health` body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `ok` when the process answers.
    pub status: &'static str,
    /// Build identifier.
    pub build: String,
    /// Uploads currently being processed.
    pub uploads_in_flight: i64,
    /// Latency of the last remote call.
    pub remote_latency_ms: i64,
    /// Uploads accepted since start.
    pub uploads_succeeded_total: u64,
    /// Uploads rejected since start.
    pub uploads_failed_total: u64,
}
