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

//! Mesh domain types and the seams between the pipeline and its collaborators.
//!
//! Layout: `model.rs` (payloads and jobs), `builder.rs` (payload construction),
//! `outcome.rs` (remote results), `engine.rs` (remote engine trait),
//! `regions.rs` (structure-set catalog), `pipeline.rs` (stages and failures),
//! `workflow.rs` (transport-facing trait), `error.rs` (domain errors).

pub mod builder;
pub mod engine;
pub mod error;
pub mod model;
pub mod outcome;
pub mod pipeline;
pub mod regions;
pub mod workflow;

pub use builder::{MeshRequestBuilder, variant_path};
pub use engine::MeshEngine;
pub use error::{CoreError, CoreResult};
pub use model::{
    CtMeshRequest, MeshComputationRequest, MeshJob, MeshKind, RegionName, RoiMeshRequest,
};
pub use outcome::{ComputationOutcome, ResponseBody};
pub use pipeline::{
    ComputationSummary, MeshDispatch, OutcomeStatus, PipelineError, PipelineResult,
    PipelineStage, UploadOptions, UploadOutcome,
};
pub use regions::{DicomRegionCatalog, RegionCatalog};
pub use workflow::MeshWorkflow;
