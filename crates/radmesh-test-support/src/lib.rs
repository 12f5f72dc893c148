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

//! Shared test helpers used across the radmesh suites.
//! Layout: fixtures.rs (in-memory zip archives), workspace.rs (on-disk workspace trees).

pub mod fixtures;
pub mod workspace;

pub use fixtures::{PLAN_ENTRIES, plan_archive, zip_archive};
pub use workspace::{TestUploads, write_workspace};
