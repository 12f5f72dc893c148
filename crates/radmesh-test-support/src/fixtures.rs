//! In-memory zip archives for unpack and upload tests.

use std::io::{Cursor, Write};

use anyhow::Result;
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

/// Entries of a minimal radiotherapy plan export.
pub const PLAN_ENTRIES: [&str; 3] = ["ctFiles/1.dcm", "rtDoseFile/0.dcm", "rtStructFile/0.dcm"];

/// Build a deflated zip archive from `(name, contents)` pairs.
///
/// Names ending in `/` become directory entries. Names are written verbatim, so
/// hostile paths such as `../../etc/passwd` can be produced on purpose.
///
/// # Errors
///
/// Returns an error if the zip writer rejects an entry.
pub fn zip_archive(entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, contents) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options)?;
        } else {
            writer.start_file(*name, options)?;
            writer.write_all(contents)?;
        }
    }
    Ok(writer.finish()?.into_inner())
}

/// Plan archive holding [`PLAN_ENTRIES`] plus any `extra` entries.
///
/// # Errors
///
/// Returns an error if the zip writer rejects an entry.
pub fn plan_archive(extra: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut entries: Vec<(&str, &[u8])> = PLAN_ENTRIES
        .iter()
        .map(|name| (*name, b"DICM".as_slice()))
        .collect();
    entries.extend_from_slice(extra);
    zip_archive(&entries)
}
