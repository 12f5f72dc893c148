//! Disposable upload roots with pre-populated workspaces.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;

use crate::fixtures::PLAN_ENTRIES;

/// Temporary `UPLOAD_DIR` removed when dropped.
pub struct TestUploads {
    dir: TempDir,
}

impl TestUploads {
    /// Create an empty upload root.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    /// Root of the upload tree.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `{root}/dicoms`.
    #[must_use]
    pub fn dicoms_root(&self) -> PathBuf {
        self.dir.path().join("dicoms")
    }

    /// Write a complete plan workspace named `name` under `dicoms/`.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be written.
    pub fn plan_workspace(&self, name: &str) -> Result<PathBuf> {
        let files: Vec<(&str, &[u8])> = PLAN_ENTRIES
            .iter()
            .map(|entry| (*entry, b"DICM".as_slice()))
            .collect();
        write_workspace(&self.dicoms_root().join(name), &files)
    }
}

/// Write `files` (relative path, contents) below `root`, creating parents.
///
/// # Errors
///
/// Returns an error if a directory or file cannot be created.
pub fn write_workspace(root: &Path, files: &[(&str, &[u8])]) -> Result<PathBuf> {
    fs::create_dir_all(root)?;
    for (relative, contents) in files {
        let target = root.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target, contents)?;
    }
    Ok(root.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_workspace_writes_fixed_layout() -> Result<()> {
        let uploads = TestUploads::new()?;
        let root = uploads.plan_workspace("plan42")?;
        assert_eq!(root, uploads.path().join("dicoms").join("plan42"));
        for entry in PLAN_ENTRIES {
            assert!(root.join(entry).is_file(), "{entry} missing");
        }
        Ok(())
    }
}
