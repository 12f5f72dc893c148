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

//! HTTP surface for uploads, mesh computation, and workspace queries.
//!
//! Layout: `http/router.rs` (router and server host), `http/upload.rs`,
//! `http/meshes.rs`, `http/dicoms.rs`, `http/health.rs` (handlers),
//! `http/errors.rs` (problem documents), `state.rs`, `models.rs`, `error.rs`.

pub mod error;
pub mod http;
pub mod models;
pub(crate) mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::ApiServer;
