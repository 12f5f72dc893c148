#![forbid(unsafe_code)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Archive intake and workspace filesystem layout.
//!
//! Layout: `naming.rs` (workspace names), `upload.rs` (spooled request bodies),
//! `unpack.rs` (zip extraction), `validate.rs` (DICOM naming policy),
//! `layout.rs` (path conventions), `locks.rs` (per-name serialisation),
//! `blocking.rs` (blocking-pool bridge), `error.rs` (error taxonomy).

pub mod blocking;
pub mod error;
pub mod layout;
pub mod locks;
pub mod naming;
pub mod unpack;
pub mod upload;
pub mod validate;

pub use blocking::run_blocking;
pub use error::{ArchiveLimit, FsOpsError, FsOpsResult};
pub use layout::{
    CT_DIR_NAME, DOSE_FILE, DicomLayout, RoiVariant, STRUCT_FILE, StorageLayout, UploadsListing,
};
pub use locks::{WorkspaceGuard, WorkspaceLocks};
pub use naming::MeshName;
pub use unpack::{ArchiveUnpacker, StagedWorkspace, UnpackedWorkspace};
pub use upload::UploadedArchive;
pub use validate::{ArchiveValidator, DICOM_NAME_PATTERN, ValidationReport};
