//! Mesh computation payloads and job descriptions.
//!
//! # Design
//! - CT and ROI requests are distinct structs joined by a tagged enum; the
//!   orchestrator dispatches with `match`, never by inspecting keys.
//! - Requests serialise as the flat snake_case objects the remote engine expects.

use std::fmt;
use std::path::{Path, PathBuf};

use radmesh_fsops::MeshName;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Named region from a structure set, kept exactly as the structure set spells it.
///
/// Output filenames go through [`RegionName::file_stem`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RegionName(String);

impl RegionName {
    /// Validate a region name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRegionName`] for blank names and names
    /// carrying control characters.
    pub fn parse(value: &str) -> CoreResult<Self> {
        let reason = if value.trim().is_empty() {
            Some("empty")
        } else if value.chars().any(char::is_control) {
            Some("control_character")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(CoreError::InvalidRegionName {
                reason,
                value: value.to_string(),
            }),
            None => Ok(Self(value.to_string())),
        }
    }

    /// Borrow the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Single path segment derived from the name for mesh output files.
    ///
    /// Separators and drive colons become `_`, and `..` becomes `__`, so
    /// `PTV 50/60` is written as `PTV 50_60`.
    #[must_use]
    pub fn file_stem(&self) -> String {
        self.0
            .replace(['/', '\\', ':'], "_")
            .replace("..", "__")
    }
}

impl fmt::Display for RegionName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Payload for `MakeCtMesh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CtMeshRequest {
    /// CT series directory.
    pub ct_fname: PathBuf,
    /// Dose file.
    pub dose_fname: PathBuf,
    /// Structure-set file.
    pub rs_fname: PathBuf,
    /// Where the engine writes the mesh.
    pub save_to: PathBuf,
}

/// Payload for `MakeRoiMesh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoiMeshRequest {
    /// Inputs and primary output shared with CT requests.
    #[serde(flatten)]
    pub base: CtMeshRequest,
    /// Region to mesh.
    pub roi_name: RegionName,
    /// Hot sub-variant output.
    pub save_hot: PathBuf,
    /// Cold sub-variant output.
    pub save_cold: PathBuf,
}

/// One outbound computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MeshComputationRequest {
    /// Whole-CT surface mesh.
    Ct(CtMeshRequest),
    /// Single-region mesh with hot/cold variants.
    Roi(RoiMeshRequest),
}

impl MeshComputationRequest {
    /// Variant of this request.
    #[must_use]
    pub const fn kind(&self) -> MeshKind {
        match self {
            Self::Ct(_) => MeshKind::Ct,
            Self::Roi(_) => MeshKind::Roi,
        }
    }

    /// Remote endpoint that serves this request.
    #[must_use]
    pub const fn endpoint(&self) -> &'static str {
        self.kind().endpoint()
    }

    /// Every output path the engine may write.
    #[must_use]
    pub fn outputs(&self) -> Vec<&Path> {
        match self {
            Self::Ct(request) => vec![request.save_to.as_path()],
            Self::Roi(request) => vec![
                request.base.save_to.as_path(),
                request.save_hot.as_path(),
                request.save_cold.as_path(),
            ],
        }
    }
}

/// `mesh_type` as sent by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeshKind {
    /// CT surface mesh.
    #[serde(rename = "CT")]
    Ct,
    /// Region-of-interest mesh.
    #[serde(rename = "ROI")]
    Roi,
}

impl MeshKind {
    /// Remote endpoint name.
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Ct => "MakeCtMesh",
            Self::Roi => "MakeRoiMesh",
        }
    }

    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ct => "CT",
            Self::Roi => "ROI",
        }
    }
}

/// A mesh computation requested against an existing workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshJob {
    /// CT mesh for a workspace.
    Ct {
        /// Source workspace.
        mesh_name: MeshName,
    },
    /// ROI mesh for one region of a workspace.
    Roi {
        /// Source workspace.
        mesh_name: MeshName,
        /// Region to mesh.
        region: RegionName,
    },
}

impl MeshJob {
    /// Interpret positional `mesh_params`: `[meshName]` for CT and
    /// `[meshName, roiName]` for ROI.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidMeshParams`] when the parameter count is wrong
    /// or the workspace name is unsafe, and [`CoreError::InvalidRegionName`] for a
    /// bad region.
    pub fn from_params(kind: MeshKind, params: &[String]) -> CoreResult<Self> {
        let expected = match kind {
            MeshKind::Ct => 1,
            MeshKind::Roi => 2,
        };
        if params.len() != expected {
            return Err(CoreError::InvalidMeshParams {
                reason: "param_count",
                value: Some(params.len().to_string()),
            });
        }
        let mesh_name = parse_mesh_name(&params[0])?;
        match kind {
            MeshKind::Ct => Ok(Self::Ct { mesh_name }),
            MeshKind::Roi => Ok(Self::Roi {
                mesh_name,
                region: RegionName::parse(&params[1])?,
            }),
        }
    }

    /// Workspace the job reads from.
    #[must_use]
    pub const fn mesh_name(&self) -> &MeshName {
        match self {
            Self::Ct { mesh_name } | Self::Roi { mesh_name, .. } => mesh_name,
        }
    }

    /// CT or ROI.
    #[must_use]
    pub const fn kind(&self) -> MeshKind {
        match self {
            Self::Ct { .. } => MeshKind::Ct,
            Self::Roi { .. } => MeshKind::Roi,
        }
    }
}

fn parse_mesh_name(value: &str) -> CoreResult<MeshName> {
    MeshName::parse(value).map_err(|_| CoreError::InvalidMeshParams {
        reason: "mesh_name",
        value: Some(value.to_string()),
    })
}
