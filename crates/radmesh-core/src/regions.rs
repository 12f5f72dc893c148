//! Region names read from RT structure-set files.

use std::error::Error;
use std::path::Path;

use dicom_dictionary_std::tags;
use dicom_object::open_file;
use tracing::warn;

use crate::error::{CoreError, CoreResult};
use crate::model::RegionName;

/// Source of region names for a workspace's structure set.
pub trait RegionCatalog: Send + Sync {
    /// Names listed in the file's `StructureSetROISequence`, in file order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnreadableStructureSet`] when the file is missing,
    /// cannot be parsed, or carries no structure-set sequence.
    fn list_regions(&self, struct_file: &Path) -> CoreResult<Vec<RegionName>>;
}

/// [`RegionCatalog`] backed by `dicom-object`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DicomRegionCatalog;

impl RegionCatalog for DicomRegionCatalog {
    fn list_regions(&self, struct_file: &Path) -> CoreResult<Vec<RegionName>> {
        if !struct_file.is_file() {
            return Err(unreadable(struct_file, "missing", None));
        }
        let object = open_file(struct_file)
            .map_err(|err| unreadable(struct_file, "parse", Some(Box::new(err))))?;
        let sequence = object
            .element(tags::STRUCTURE_SET_ROI_SEQUENCE)
            .map_err(|err| unreadable(struct_file, "not_structure_set", Some(Box::new(err))))?;
        let items = sequence
            .items()
            .ok_or_else(|| unreadable(struct_file, "not_structure_set", None))?;

        let mut regions = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let Some(raw) = item
                .element(tags::ROI_NAME)
                .ok()
                .and_then(|element| element.to_str().ok())
            else {
                warn!(
                    index,
                    path = %struct_file.display(),
                    "structure set item without ROI name"
                );
                continue;
            };
            match RegionName::parse(raw.trim()) {
                Ok(region) => regions.push(region),
                Err(_) => {
                    warn!(index, roi_name = %raw, "skipping blank ROI name");
                }
            }
        }
        Ok(regions)
    }
}

fn unreadable(
    path: &Path,
    reason: &'static str,
    source: Option<Box<dyn Error + Send + Sync>>,
) -> CoreError {
    CoreError::UnreadableStructureSet {
        path: path.to_path_buf(),
        reason,
        source,
    }
}
