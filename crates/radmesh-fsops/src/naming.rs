//! Workspace names derived from untrusted archive filenames and URL segments.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::{FsOpsError, FsOpsResult};

/// Validated workspace identifier.
///
/// A `MeshName` is always safe to join onto a directory: it is non-empty, has no
/// path separators, no `..`, no drive prefix, no control characters, and does not
/// start with `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MeshName(String);

impl MeshName {
    /// Derive the workspace name from an uploaded archive's declared filename by
    /// stripping its extension (`plan42.zip` → `plan42`).
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::InvalidArchiveName`] when the filename is empty, carries
    /// a directory component, or the stem is not a safe workspace name.
    pub fn from_archive_filename(filename: &str) -> FsOpsResult<Self> {
        let trimmed = filename.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty", filename));
        }
        if trimmed.contains(['/', '\\']) || Path::new(trimmed).is_absolute() {
            return Err(invalid("path_component", filename));
        }
        let stem = match trimmed.rfind('.') {
            Some(0) | None => trimmed,
            Some(index) => &trimmed[..index],
        };
        Self::parse(stem)
    }

    /// Validate a name supplied directly, e.g. from a URL path segment.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::InvalidArchiveName`] when the value is not a safe
    /// single path segment.
    pub fn parse(value: &str) -> FsOpsResult<Self> {
        if value.trim().is_empty() {
            return Err(invalid("empty", value));
        }
        if value.contains("..") {
            return Err(invalid("parent_reference", value));
        }
        if value.contains(['/', '\\', ':']) {
            return Err(invalid("path_component", value));
        }
        if value.chars().any(char::is_control) {
            return Err(invalid("control_character", value));
        }
        if value.starts_with('.') {
            return Err(invalid("hidden", value));
        }
        Ok(Self(value.to_string()))
    }

    /// Borrow the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MeshName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl AsRef<Path> for MeshName {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

fn invalid(reason: &'static str, value: &str) -> FsOpsError {
    FsOpsError::InvalidArchiveName {
        reason,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(result: FsOpsResult<MeshName>) -> Option<&'static str> {
        match result {
            Err(FsOpsError::InvalidArchiveName { reason, .. }) => Some(reason),
            _ => None,
        }
    }

    #[test]
    fn strips_only_the_last_extension() -> anyhow::Result<()> {
        assert_eq!(MeshName::from_archive_filename("plan42.zip")?.as_str(), "plan42");
        assert_eq!(
            MeshName::from_archive_filename("patient 7.v2.zip")?.as_str(),
            "patient 7.v2"
        );
        assert_eq!(MeshName::from_archive_filename("plan42")?.as_str(), "plan42");
        Ok(())
    }

    #[test]
    fn rejects_traversal_and_empty_names() {
        assert_eq!(reason(MeshName::from_archive_filename("")), Some("empty"));
        assert_eq!(reason(MeshName::from_archive_filename(".zip")), Some("hidden"));
        assert_eq!(
            reason(MeshName::from_archive_filename("../evil.zip")),
            Some("path_component")
        );
        assert_eq!(
            reason(MeshName::from_archive_filename("/abs/plan.zip")),
            Some("path_component")
        );
        assert_eq!(
            reason(MeshName::from_archive_filename("C:\\plan.zip")),
            Some("path_component")
        );
        assert_eq!(
            reason(MeshName::from_archive_filename("...zip")),
            Some("parent_reference")
        );
    }

    #[test]
    fn parse_rejects_unsafe_segments() {
        assert_eq!(reason(MeshName::parse("..")), Some("parent_reference"));
        assert_eq!(reason(MeshName::parse("a/b")), Some("path_component"));
        assert_eq!(reason(MeshName::parse("c:x")), Some("path_component"));
        assert_eq!(reason(MeshName::parse("bad\0name")), Some("control_character"));
        assert_eq!(reason(MeshName::parse(".hidden")), Some("hidden"));
        assert!(MeshName::parse("plan42").is_ok());
    }
}
