//! Shared state handed to every handler.

use std::sync::Arc;

use radmesh_core::MeshWorkflow;
use radmesh_telemetry::Metrics;

pub(crate) struct ApiState {
    pub(crate) workflow: Arc<dyn MeshWorkflow>,
    pub(crate) telemetry: Metrics,
    pub(crate) spool_threshold_bytes: usize,
}

impl ApiState {
    pub(crate) fn new(
        workflow: Arc<dyn MeshWorkflow>,
        telemetry: Metrics,
        spool_threshold_bytes: usize,
    ) -> Self {
        Self {
            workflow,
            telemetry,
            spool_threshold_bytes,
        }
    }
}
