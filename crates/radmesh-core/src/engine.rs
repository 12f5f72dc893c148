//! Seam between the orchestrator and the remote mesh engine.

use async_trait::async_trait;

use crate::model::MeshComputationRequest;
use crate::outcome::ComputationOutcome;

/// Remote mesh computation peer.
///
/// Implementations send exactly one request per call, never retry, and report
/// every failure as a [`ComputationOutcome`] variant instead of an error.
#[async_trait]
pub trait MeshEngine: Send + Sync {
    /// Send `request` to the endpoint matching its variant.
    async fn dispatch(&self, request: &MeshComputationRequest) -> ComputationOutcome;
}
