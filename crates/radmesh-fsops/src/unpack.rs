//! Archive extraction into per-upload workspaces.
//!
//! # Design
//! - Every entry is checked (count, declared size, target path) before the first write.
//! - Extraction happens in a staging directory beside the workspace and is swapped
//!   into place only after every entry is on disk; failures leave the prior
//!   workspace untouched.
//! - Callers that need to inspect the tree before it replaces anything use
//!   [`ArchiveUnpacker::stage_as`] and decide between [`StagedWorkspace::commit`]
//!   and [`StagedWorkspace::discard`].
//! - Written bytes are counted during the copy because declared sizes can lie.

use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};

use radmesh_config::ArchiveLimits;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{ArchiveLimit, FsOpsError, FsOpsResult};
use crate::naming::MeshName;
use crate::upload::UploadedArchive;

const COPY_BUFFER_BYTES: usize = 64 * 1024;

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnpackedWorkspace {
    /// Workspace identifier.
    pub mesh_name: MeshName,
    /// Absolute location of the workspace.
    pub path: PathBuf,
    /// Regular files written.
    pub files_written: usize,
    /// Uncompressed bytes written.
    pub bytes_written: u64,
}

/// Extracts uploaded archives below the workspace root.
#[derive(Debug, Clone)]
pub struct ArchiveUnpacker {
    dicoms_root: PathBuf,
    limits: ArchiveLimits,
}

struct PlannedEntry {
    index: usize,
    name: String,
    relative: PathBuf,
    is_dir: bool,
}

impl ArchiveUnpacker {
    /// Unpacker writing workspaces under `dicoms_root`.
    #[must_use]
    pub fn new(dicoms_root: impl Into<PathBuf>, limits: ArchiveLimits) -> Self {
        Self {
            dicoms_root: dicoms_root.into(),
            limits,
        }
    }

    /// Root under which workspaces are created.
    #[must_use]
    pub fn dicoms_root(&self) -> &Path {
        &self.dicoms_root
    }

    /// Unpack `archive` into the workspace named after its declared filename.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::InvalidArchiveName`] before touching the archive when
    /// the filename is unusable, then any error from [`Self::unpack_as`].
    pub fn unpack(&self, archive: UploadedArchive) -> FsOpsResult<UnpackedWorkspace> {
        let mesh_name = MeshName::from_archive_filename(archive.declared_filename())?;
        self.unpack_as(&mesh_name, archive)
    }

    /// Unpack `archive` into the workspace `mesh_name`, replacing any prior one.
    ///
    /// # Errors
    ///
    /// - [`FsOpsError::CorruptArchive`] when the archive or an entry cannot be read.
    /// - [`FsOpsError::OversizedArchive`] when a configured ceiling is exceeded.
    /// - [`FsOpsError::PathTraversalAttempt`] when an entry would land outside the workspace.
    /// - [`FsOpsError::Io`] when the filesystem refuses a write.
    pub fn unpack_as(
        &self,
        mesh_name: &MeshName,
        archive: UploadedArchive,
    ) -> FsOpsResult<UnpackedWorkspace> {
        self.stage_as(mesh_name, archive)?.commit()
    }

    /// Extract `archive` into a staging directory without touching the workspace
    /// `mesh_name`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::unpack_as`], minus the final swap.
    pub fn stage_as(
        &self,
        mesh_name: &MeshName,
        archive: UploadedArchive,
    ) -> FsOpsResult<StagedWorkspace> {
        let spilled = archive.is_spilled();
        let reader = archive.into_reader()?;
        debug!(mesh_name = %mesh_name, spilled, "opening uploaded archive");
        self.stage_reader(mesh_name, reader)
    }

    /// Unpack any seekable zip stream into the workspace `mesh_name`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::unpack_as`].
    pub fn unpack_reader<R: Read + Seek>(
        &self,
        mesh_name: &MeshName,
        reader: R,
    ) -> FsOpsResult<UnpackedWorkspace> {
        self.stage_reader(mesh_name, reader)?.commit()
    }

    /// Stage any seekable zip stream for the workspace `mesh_name`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::stage_as`].
    pub fn stage_reader<R: Read + Seek>(
        &self,
        mesh_name: &MeshName,
        reader: R,
    ) -> FsOpsResult<StagedWorkspace> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|source| FsOpsError::corrupt("unpack.open", None, source))?;
        let plan = self.plan(&mut archive)?;

        fs::create_dir_all(&self.dicoms_root)
            .map_err(|source| FsOpsError::io("unpack.create_root", &self.dicoms_root, source))?;
        let staging = StagingDir::create(&self.dicoms_root, mesh_name)?;
        let (files_written, bytes_written) = self.extract(&mut archive, &plan, staging.path())?;
        debug!(
            mesh_name = %mesh_name,
            files = files_written,
            bytes = bytes_written,
            "archive staged"
        );
        Ok(StagedWorkspace {
            mesh_name: mesh_name.clone(),
            target: self.dicoms_root.join(mesh_name),
            staging,
            files_written,
            bytes_written,
        })
    }

    fn plan<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> FsOpsResult<Vec<PlannedEntry>> {
        let entries = archive.len();
        if entries > self.limits.max_entries {
            return Err(FsOpsError::oversized(
                ArchiveLimit::Entries,
                self.limits.max_entries as u64,
                entries as u64,
            ));
        }

        let mut declared: u64 = 0;
        let mut plan = Vec::with_capacity(entries);
        for index in 0..entries {
            let entry = archive
                .by_index(index)
                .map_err(|source| FsOpsError::corrupt("unpack.scan_entry", None, source))?;
            let name = entry.name().to_string();
            let relative = sanitize_entry_path(&name)?;
            let is_dir = entry.is_dir();
            if relative.as_os_str().is_empty() {
                if is_dir {
                    continue;
                }
                return Err(FsOpsError::PathTraversalAttempt { entry: name });
            }

            declared = declared.saturating_add(entry.size());
            if declared > self.limits.max_total_bytes {
                return Err(FsOpsError::oversized(
                    ArchiveLimit::DeclaredBytes,
                    self.limits.max_total_bytes,
                    declared,
                ));
            }
            plan.push(PlannedEntry {
                index,
                name,
                relative,
                is_dir,
            });
        }
        Ok(plan)
    }

    fn extract<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        plan: &[PlannedEntry],
        staging: &Path,
    ) -> FsOpsResult<(usize, u64)> {
        let mut buffer = vec![0_u8; COPY_BUFFER_BYTES];
        let mut files = 0_usize;
        let mut written = 0_u64;

        for planned in plan {
            let destination = staging.join(&planned.relative);
            if planned.is_dir {
                fs::create_dir_all(&destination).map_err(|source| {
                    FsOpsError::io("unpack.create_dir", &destination, source)
                })?;
                continue;
            }
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)
                    .map_err(|source| FsOpsError::io("unpack.create_parent", parent, source))?;
            }

            let mut entry = archive.by_index(planned.index).map_err(|source| {
                FsOpsError::corrupt("unpack.open_entry", Some(planned.name.clone()), source)
            })?;
            let mut output = File::create(&destination)
                .map_err(|source| FsOpsError::io("unpack.create_file", &destination, source))?;
            loop {
                let read = match entry.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(read) => read,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        return Err(FsOpsError::corrupt(
                            "unpack.read_entry",
                            Some(planned.name.clone()),
                            ZipError::Io(err),
                        ));
                    }
                };
                written = written.saturating_add(read as u64);
                if written > self.limits.max_total_bytes {
                    return Err(FsOpsError::oversized(
                        ArchiveLimit::WrittenBytes,
                        self.limits.max_total_bytes,
                        written,
                    ));
                }
                output
                    .write_all(&buffer[..read])
                    .map_err(|source| FsOpsError::io("unpack.write_entry", &destination, source))?;
            }
            files += 1;
        }
        Ok((files, written))
    }
}

/// Normalise an archive entry name into a path relative to the workspace.
///
/// Backslashes are treated as separators. Absolute names, drive prefixes, and any
/// `..` component are rejected.
pub(crate) fn sanitize_entry_path(entry: &str) -> FsOpsResult<PathBuf> {
    let normalised = entry.replace('\\', "/");
    let traversal = || FsOpsError::PathTraversalAttempt {
        entry: entry.to_string(),
    };
    if normalised.starts_with('/') {
        return Err(traversal());
    }

    let mut sanitized = PathBuf::new();
    for component in Path::new(&normalised).components() {
        match component {
            Component::Normal(segment) => {
                if segment.to_string_lossy().contains(':') {
                    return Err(traversal());
                }
                sanitized.push(segment);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(traversal());
            }
        }
    }
    Ok(sanitized)
}

/// Fully extracted archive waiting to replace its workspace.
///
/// Dropping the handle without committing removes the staged tree.
#[derive(Debug)]
pub struct StagedWorkspace {
    mesh_name: MeshName,
    target: PathBuf,
    staging: StagingDir,
    files_written: usize,
    bytes_written: u64,
}

impl StagedWorkspace {
    /// Directory holding the extracted entries.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.staging.path()
    }

    /// Workspace the staged tree will replace on commit.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Workspace identifier.
    #[must_use]
    pub const fn mesh_name(&self) -> &MeshName {
        &self.mesh_name
    }

    /// Swap the staged tree into place, retiring any prior workspace.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Io`] when a rename fails; the prior workspace is
    /// restored first when it had already been moved aside.
    pub fn commit(self) -> FsOpsResult<UnpackedWorkspace> {
        self.staging.commit(&self.target)?;
        info!(
            mesh_name = %self.mesh_name,
            files = self.files_written,
            bytes = self.bytes_written,
            "archive unpacked"
        );
        Ok(UnpackedWorkspace {
            mesh_name: self.mesh_name,
            path: self.target,
            files_written: self.files_written,
            bytes_written: self.bytes_written,
        })
    }

    /// Remove the staged tree, leaving any prior workspace as it was.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Io`] when the staging directory cannot be removed.
    pub fn discard(self) -> FsOpsResult<()> {
        self.staging.discard()
    }
}

/// Extraction target removed on drop unless committed.
#[derive(Debug)]
struct StagingDir {
    path: PathBuf,
    root: PathBuf,
    committed: bool,
}

impl StagingDir {
    fn create(root: &Path, mesh_name: &MeshName) -> FsOpsResult<Self> {
        let path = root.join(format!(".staging-{mesh_name}-{}", Uuid::new_v4()));
        fs::create_dir(&path)
            .map_err(|source| FsOpsError::io("unpack.create_staging", &path, source))?;
        Ok(Self {
            path,
            root: root.to_path_buf(),
            committed: false,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Move the staged tree to `target`, retiring any existing workspace first.
    fn commit(mut self, target: &Path) -> FsOpsResult<()> {
        let retired = if target.exists() {
            let retired = self.root.join(format!(".retired-{}", Uuid::new_v4()));
            fs::rename(target, &retired)
                .map_err(|source| FsOpsError::io("unpack.retire_previous", target, source))?;
            Some(retired)
        } else {
            None
        };

        if let Err(source) = fs::rename(&self.path, target) {
            if let Some(retired) = &retired
                && let Err(restore) = fs::rename(retired, target)
            {
                warn!(
                    path = %target.display(),
                    error = %restore,
                    "failed to restore previous workspace"
                );
            }
            return Err(FsOpsError::io("unpack.commit", target, source));
        }
        self.committed = true;

        if let Some(retired) = retired
            && let Err(err) = fs::remove_dir_all(&retired)
        {
            warn!(
                path = %retired.display(),
                error = %err,
                "failed to remove replaced workspace"
            );
        }
        Ok(())
    }

    fn discard(mut self) -> FsOpsResult<()> {
        self.committed = true;
        fs::remove_dir_all(&self.path)
            .map_err(|source| FsOpsError::io("unpack.discard_staging", &self.path, source))
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if !self.committed
            && let Err(err) = fs::remove_dir_all(&self.path)
        {
            warn!(
                path = %self.path.display(),
                error = %err,
                "failed to remove staging directory"
            );
        }
    }
}
