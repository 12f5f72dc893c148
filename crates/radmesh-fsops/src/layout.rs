//! Fixed on-disk conventions for workspaces and computed meshes.
//!
//! # Design
//! - `DicomLayout::resolve` never touches the filesystem; existence is checked
//!   only by the `require_*` accessors, at the moment a consumer needs the path.
//! - `StorageLayout` is the single place that turns configuration into paths.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use radmesh_config::StorageConfig;
use serde::{Deserialize, Serialize};

use crate::error::{FsOpsError, FsOpsResult};
use crate::naming::MeshName;

/// CT series directory inside a workspace.
pub const CT_DIR_NAME: &str = "ctFiles";
/// Dose file inside a workspace.
pub const DOSE_FILE: &str = "rtDoseFile/0.dcm";
/// Structure-set file inside a workspace.
pub const STRUCT_FILE: &str = "rtStructFile/0.dcm";
/// Extension of computed mesh files.
pub const MESH_EXTENSION: &str = "obj";

/// Expected input locations inside one workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DicomLayout {
    root: PathBuf,
    ct_dir: PathBuf,
    dose_file: PathBuf,
    struct_file: PathBuf,
}

impl DicomLayout {
    /// Map a workspace directory onto the fixed layout.
    #[must_use]
    pub fn resolve(workspace: impl AsRef<Path>) -> Self {
        let root = workspace.as_ref().to_path_buf();
        Self {
            ct_dir: root.join(CT_DIR_NAME),
            dose_file: root.join(DOSE_FILE),
            struct_file: root.join(STRUCT_FILE),
            root,
        }
    }

    /// Workspace directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// CT series directory, whether or not it exists.
    #[must_use]
    pub fn ct_dir(&self) -> &Path {
        &self.ct_dir
    }

    /// Dose file, whether or not it exists.
    #[must_use]
    pub fn dose_file(&self) -> &Path {
        &self.dose_file
    }

    /// Structure-set file, whether or not it exists.
    #[must_use]
    pub fn struct_file(&self) -> &Path {
        &self.struct_file
    }

    /// CT series directory, which must exist.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::MissingWorkspaceFile`] when the directory is absent.
    pub fn require_ct_dir(&self) -> FsOpsResult<&Path> {
        require(&self.ct_dir, Path::is_dir)
    }

    /// Dose file, which must exist.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::MissingWorkspaceFile`] when the file is absent.
    pub fn require_dose_file(&self) -> FsOpsResult<&Path> {
        require(&self.dose_file, Path::is_file)
    }

    /// Structure-set file, which must exist.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::MissingWorkspaceFile`] when the file is absent.
    pub fn require_struct_file(&self) -> FsOpsResult<&Path> {
        require(&self.struct_file, Path::is_file)
    }

    /// Check every input needed for a mesh computation.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::MissingWorkspaceFile`] for the first absent input.
    pub fn ensure_complete(&self) -> FsOpsResult<()> {
        self.require_ct_dir()?;
        self.require_dose_file()?;
        self.require_struct_file()?;
        Ok(())
    }
}

fn require(path: &Path, present: fn(&Path) -> bool) -> FsOpsResult<&Path> {
    if present(path) {
        Ok(path)
    } else {
        Err(FsOpsError::MissingWorkspaceFile {
            path: path.to_path_buf(),
        })
    }
}

/// Which ROI mesh file to read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoiVariant {
    /// `{roi}.obj`
    #[default]
    Base,
    /// `{roi}_hot.obj`
    Hot,
    /// `{roi}_cold.obj`
    Cold,
}

impl RoiVariant {
    /// Suffix inserted between the region name and the extension.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Base => "",
            Self::Hot => "_hot",
            Self::Cold => "_cold",
        }
    }
}

/// Directory contents reported by the upload listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadsListing {
    /// Absolute location of the workspace root.
    pub path: PathBuf,
    /// Visible entries directly below the root, sorted.
    pub entries: Vec<String>,
}

/// Persisted tree derived from [`StorageConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    upload_dir: PathBuf,
    dicoms_root: PathBuf,
    roi_root: PathBuf,
    ct_root: PathBuf,
}

impl StorageLayout {
    /// Layout for the configured storage roots.
    #[must_use]
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            dicoms_root: config.dicoms_root(),
            roi_root: config.roi_root(),
            ct_root: config.ct_root(),
        }
    }

    /// `UPLOAD_DIR`.
    #[must_use]
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// `UPLOAD_DIR/DICOMS_DIR`.
    #[must_use]
    pub fn dicoms_root(&self) -> &Path {
        &self.dicoms_root
    }

    /// `UPLOAD_DIR/ROI`.
    #[must_use]
    pub fn roi_root(&self) -> &Path {
        &self.roi_root
    }

    /// `UPLOAD_DIR/CT`.
    #[must_use]
    pub fn ct_root(&self) -> &Path {
        &self.ct_root
    }

    /// Workspace directory for `name`.
    #[must_use]
    pub fn workspace(&self, name: &MeshName) -> PathBuf {
        self.dicoms_root.join(name)
    }

    /// Input layout of the workspace `name`.
    #[must_use]
    pub fn dicom_layout(&self, name: &MeshName) -> DicomLayout {
        DicomLayout::resolve(self.workspace(name))
    }

    /// `UPLOAD_DIR/CT/{name}/{name}.obj`.
    #[must_use]
    pub fn ct_mesh_path(&self, name: &MeshName) -> PathBuf {
        self.ct_root
            .join(name)
            .join(format!("{name}.{MESH_EXTENSION}"))
    }

    /// `UPLOAD_DIR/ROI/{name}/{roi}{suffix}.obj`.
    ///
    /// `roi` must already be a single safe path segment.
    #[must_use]
    pub fn roi_mesh_path(&self, name: &MeshName, roi: &str, variant: RoiVariant) -> PathBuf {
        self.roi_root
            .join(name)
            .join(format!("{roi}{}.{MESH_EXTENSION}", variant.suffix()))
    }

    /// Names of every workspace directory, sorted.
    ///
    /// Staging leftovers and other entries that are not valid workspace names are
    /// skipped. A missing root yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Io`] if the root cannot be read.
    pub fn list_workspaces(&self) -> FsOpsResult<Vec<MeshName>> {
        let mut names = Vec::new();
        for (name, is_dir) in self.read_root()? {
            if is_dir && let Ok(mesh_name) = MeshName::parse(&name) {
                names.push(mesh_name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Visible entries directly below the workspace root.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Io`] if the root cannot be read.
    pub fn list_uploads(&self) -> FsOpsResult<UploadsListing> {
        let mut entries: Vec<String> = self
            .read_root()?
            .into_iter()
            .map(|(name, _)| name)
            .filter(|name| !name.starts_with('.'))
            .collect();
        entries.sort();
        Ok(UploadsListing {
            path: self.dicoms_root.clone(),
            entries,
        })
    }

    fn read_root(&self) -> FsOpsResult<Vec<(String, bool)>> {
        let reader = match fs::read_dir(&self.dicoms_root) {
            Ok(reader) => reader,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(FsOpsError::io(
                    "layout.read_root",
                    &self.dicoms_root,
                    source,
                ));
            }
        };
        let mut entries = Vec::new();
        for entry in reader {
            let entry = entry
                .map_err(|source| FsOpsError::io("layout.read_entry", &self.dicoms_root, source))?;
            let is_dir = entry
                .file_type()
                .map_err(|source| FsOpsError::io("layout.file_type", entry.path(), source))?
                .is_dir();
            entries.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
        }
        Ok(entries)
    }
}
