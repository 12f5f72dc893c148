//! Pure construction of outbound mesh payloads from a resolved layout.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use radmesh_fsops::{DicomLayout, RoiVariant};

use crate::error::CoreResult;
use crate::model::{CtMeshRequest, RegionName, RoiMeshRequest};

/// Builds CT and ROI payloads for one workspace.
#[derive(Debug, Clone, Copy)]
pub struct MeshRequestBuilder<'a> {
    layout: &'a DicomLayout,
}

impl<'a> MeshRequestBuilder<'a> {
    /// Builder reading input paths from `layout`.
    #[must_use]
    pub const fn new(layout: &'a DicomLayout) -> Self {
        Self { layout }
    }

    /// CT payload writing to `output`.
    #[must_use]
    pub fn ct_request(&self, output: impl Into<PathBuf>) -> CtMeshRequest {
        CtMeshRequest {
            ct_fname: self.layout.ct_dir().to_path_buf(),
            dose_fname: self.layout.dose_file().to_path_buf(),
            rs_fname: self.layout.struct_file().to_path_buf(),
            save_to: output.into(),
        }
    }

    /// ROI payload writing to `output`, with hot/cold siblings derived from it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::InvalidRegionName`] when `region` is blank or
    /// carries control characters.
    pub fn roi_request(
        &self,
        output: impl Into<PathBuf>,
        region: &str,
    ) -> CoreResult<RoiMeshRequest> {
        let roi_name = RegionName::parse(region)?;
        let output = output.into();
        Ok(RoiMeshRequest {
            save_hot: variant_path(&output, RoiVariant::Hot),
            save_cold: variant_path(&output, RoiVariant::Cold),
            base: self.ct_request(output),
            roi_name,
        })
    }
}

/// Insert the variant suffix between the file stem and its extension.
#[must_use]
pub fn variant_path(output: &Path, variant: RoiVariant) -> PathBuf {
    let Some(stem) = output.file_stem() else {
        return output.to_path_buf();
    };
    let mut name = OsString::from(stem);
    name.push(variant.suffix());
    if let Some(extension) = output.extension() {
        name.push(".");
        name.push(extension);
    }
    output.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn spinal_cord_variants_are_siblings() -> anyhow::Result<()> {
        let layout = DicomLayout::resolve("/up/dicoms/plan42");
        let request = MeshRequestBuilder::new(&layout)
            .roi_request("/up/ROI/plan42/spinal_cord.obj", "spinal_cord")?;

        assert_eq!(
            request.save_hot,
            PathBuf::from("/up/ROI/plan42/spinal_cord_hot.obj")
        );
        assert_eq!(
            request.save_cold,
            PathBuf::from("/up/ROI/plan42/spinal_cord_cold.obj")
        );
        assert_eq!(
            request.base.save_to,
            PathBuf::from("/up/ROI/plan42/spinal_cord.obj")
        );
        assert_eq!(request.base.ct_fname, layout.ct_dir());
        assert_eq!(request.roi_name.as_str(), "spinal_cord");
        Ok(())
    }

    #[test]
    fn ct_request_uses_layout_inputs() {
        let layout = DicomLayout::resolve("/up/dicoms/plan42");
        let request = MeshRequestBuilder::new(&layout).ct_request("/up/CT/plan42/plan42.obj");
        assert_eq!(request.ct_fname, PathBuf::from("/up/dicoms/plan42/ctFiles"));
        assert_eq!(
            request.dose_fname,
            PathBuf::from("/up/dicoms/plan42/rtDoseFile/0.dcm")
        );
        assert_eq!(
            request.rs_fname,
            PathBuf::from("/up/dicoms/plan42/rtStructFile/0.dcm")
        );
    }

    #[test]
    fn empty_region_is_rejected() {
        let layout = DicomLayout::resolve("/up/dicoms/plan42");
        let result = MeshRequestBuilder::new(&layout).roi_request("/up/ROI/plan42/.obj", "");
        assert!(matches!(result, Err(CoreError::InvalidRegionName { .. })));
    }

    #[test]
    fn variant_path_without_extension_appends_suffix() {
        assert_eq!(
            variant_path(Path::new("/out/mesh"), RoiVariant::Hot),
            PathBuf::from("/out/mesh_hot")
        );
        assert_eq!(
            variant_path(Path::new("/out/mesh.obj"), RoiVariant::Base),
            PathBuf::from("/out/mesh.obj")
        );
    }
}
