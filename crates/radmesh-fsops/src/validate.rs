//! DICOM naming policy applied to unpacked workspaces.

use std::path::{Component, Path};

use radmesh_config::ValidationConfig;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{FsOpsError, FsOpsResult};

/// Accepted shape for a workspace-relative file path.
pub const DICOM_NAME_PATTERN: &str = r"^[A-Za-z0-9 ./\\-]*\.dcm$";

/// Outcome of checking every file in a workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    checked: usize,
    invalid_entries: Vec<String>,
}

impl ValidationReport {
    /// True when no offending file was found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.invalid_entries.is_empty()
    }

    /// Number of regular files inspected.
    #[must_use]
    pub const fn checked(&self) -> usize {
        self.checked
    }

    /// Workspace-relative paths that break the naming policy, in walk order.
    #[must_use]
    pub fn invalid_entries(&self) -> &[String] {
        &self.invalid_entries
    }

    /// Consume the report, keeping only the offending paths.
    #[must_use]
    pub fn into_invalid_entries(self) -> Vec<String> {
        self.invalid_entries
    }
}

/// Read-only naming check over an unpacked workspace.
#[derive(Debug, Clone)]
pub struct ArchiveValidator {
    pattern: Regex,
}

impl ArchiveValidator {
    /// Validator with case-sensitive or case-insensitive `.dcm` matching.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Pattern`] if the naming pattern fails to compile.
    pub fn new(case_insensitive: bool) -> FsOpsResult<Self> {
        let pattern = RegexBuilder::new(DICOM_NAME_PATTERN)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|source| FsOpsError::Pattern { source })?;
        Ok(Self { pattern })
    }

    /// Validator configured from the service settings.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`].
    pub fn from_config(config: &ValidationConfig) -> FsOpsResult<Self> {
        Self::new(config.case_insensitive)
    }

    /// Whether a single `/`-separated relative path satisfies the policy.
    #[must_use]
    pub fn is_valid_name(&self, relative: &str) -> bool {
        self.pattern.is_match(relative)
    }

    /// Visit every regular file below `workspace` and collect the offenders.
    ///
    /// Never mutates the workspace and never stops at the first offender.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Walkdir`] if the workspace cannot be traversed.
    pub fn validate(&self, workspace: &Path) -> FsOpsResult<ValidationReport> {
        let mut report = ValidationReport::default();
        for entry in WalkDir::new(workspace)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|source| FsOpsError::walkdir(workspace, source))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = relative_name(workspace, entry.path());
            report.checked += 1;
            if !self.is_valid_name(&relative) {
                report.invalid_entries.push(relative);
            }
        }
        Ok(report)
    }
}

fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
