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

//! HTTP client for the remote mesh engine.
//!
//! Layout: `client.rs` (`GenieClient` and response classification), `error.rs`.

pub mod client;
pub mod error;

pub use client::{GenieClient, HEADER_REQUEST_ID};
pub use error::{GenieError, GenieResult};
