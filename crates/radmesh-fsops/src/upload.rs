//! Uploaded archive bodies, held in memory until they outgrow a threshold.

use std::io::{Seek, SeekFrom, Write};

use tempfile::SpooledTempFile;

use crate::error::{FsOpsError, FsOpsResult};

const SPOOL_PATH: &str = "<upload spool>";

/// One uploaded archive: the client's declared filename plus its bytes.
///
/// Bytes are buffered in memory up to the spool threshold and then moved to an
/// anonymous temporary file, so concurrent large uploads do not pin their full
/// size in memory.
#[derive(Debug)]
pub struct UploadedArchive {
    filename: String,
    spool: SpooledTempFile,
    len: u64,
}

impl UploadedArchive {
    /// Start an empty upload that spills to disk beyond `threshold` bytes.
    #[must_use]
    pub fn spooled(filename: impl Into<String>, threshold: usize) -> Self {
        Self {
            filename: filename.into(),
            spool: SpooledTempFile::new(threshold),
            len: 0,
        }
    }

    /// Build an upload from bytes already in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if spilling to the temporary file fails.
    pub fn from_bytes(
        filename: impl Into<String>,
        bytes: &[u8],
        threshold: usize,
    ) -> FsOpsResult<Self> {
        let mut archive = Self::spooled(filename, threshold);
        archive.append(bytes)?;
        Ok(archive)
    }

    /// Append a chunk of the request body.
    ///
    /// # Errors
    ///
    /// Returns an error if spilling to the temporary file fails.
    pub fn append(&mut self, chunk: &[u8]) -> FsOpsResult<()> {
        self.spool
            .write_all(chunk)
            .map_err(|source| FsOpsError::io("upload.append", SPOOL_PATH, source))?;
        self.len += chunk.len() as u64;
        Ok(())
    }

    /// Filename as declared by the client.
    #[must_use]
    pub fn declared_filename(&self) -> &str {
        &self.filename
    }

    /// Bytes received so far.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Whether no bytes were received.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the body has been moved to a temporary file.
    #[must_use]
    pub fn is_spilled(&self) -> bool {
        self.spool.is_rolled()
    }

    /// Rewind and hand out the body for reading.
    pub(crate) fn into_reader(mut self) -> FsOpsResult<SpooledTempFile> {
        self.spool
            .seek(SeekFrom::Start(0))
            .map_err(|source| FsOpsError::io("upload.rewind", SPOOL_PATH, source))?;
        Ok(self.spool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn small_uploads_stay_in_memory() -> anyhow::Result<()> {
        let archive = UploadedArchive::from_bytes("plan42.zip", b"abc", 16)?;
        assert_eq!(archive.len(), 3);
        assert!(!archive.is_spilled());
        assert_eq!(archive.declared_filename(), "plan42.zip");
        Ok(())
    }

    #[test]
    fn large_uploads_spill_and_read_back() -> anyhow::Result<()> {
        let mut archive = UploadedArchive::spooled("plan42.zip", 4);
        assert!(archive.is_empty());
        archive.append(b"0123")?;
        archive.append(b"4567")?;
        assert!(archive.is_spilled());

        let mut contents = String::new();
        archive.into_reader()?.read_to_string(&mut contents)?;
        assert_eq!(contents, "01234567");
        Ok(())
    }
}
