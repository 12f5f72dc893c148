//! Workflow surface consumed by the HTTP layer.

use std::path::PathBuf;

use async_trait::async_trait;
use radmesh_fsops::{MeshName, RoiVariant, UploadedArchive, UploadsListing};

use crate::model::{MeshJob, RegionName};
use crate::pipeline::{MeshDispatch, PipelineResult, UploadOptions, UploadOutcome};

/// Operations the transport drives.
#[async_trait]
pub trait MeshWorkflow: Send + Sync {
    /// Run the upload pipeline. Always yields a structured outcome.
    async fn upload(&self, archive: UploadedArchive, options: UploadOptions) -> UploadOutcome;

    /// Compute a mesh for an existing workspace.
    ///
    /// Non-success remote outcomes are returned inside [`MeshDispatch`] so the
    /// caller can surface the remote status verbatim.
    async fn make_mesh(&self, job: MeshJob) -> PipelineResult<MeshDispatch>;

    /// Workspace names, sorted.
    async fn list_workspaces(&self) -> PipelineResult<Vec<MeshName>>;

    /// Region names in a workspace's structure set.
    async fn list_regions(&self, mesh_name: &MeshName) -> PipelineResult<Vec<RegionName>>;

    /// Visible entries under the workspace root.
    async fn uploads_summary(&self) -> PipelineResult<UploadsListing>;

    /// Location of a computed ROI mesh, whether or not it exists yet.
    fn roi_mesh_path(
        &self,
        mesh_name: &MeshName,
        region: &RegionName,
        variant: RoiVariant,
    ) -> PathBuf;
}
