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

//! radmesh application bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (service wiring), `orchestrator.rs` (upload and mesh
//! workflow), `error.rs` (application errors).

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application-level errors.
pub mod error;
/// Upload pipeline and mesh dispatch orchestration.
pub mod orchestrator;

pub use bootstrap::{build_server, run_app, run_app_with};
pub use error::{AppError, AppResult};
pub use orchestrator::UploadOrchestrator;
