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

//! Environment-backed configuration for the radmesh services.
//!
//! Layout: `model.rs` (typed configuration), `loader.rs` (environment parsing),
//! `defaults.rs` (fallback values), `error.rs` (structured errors).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;

pub use error::{ConfigError, ConfigResult};
pub use model::{
    ArchiveLimits, HttpConfig, InvalidEntryPolicy, LoggingSettings, MeshConfig, RemoteConfig,
    StorageConfig, ValidationConfig,
};
