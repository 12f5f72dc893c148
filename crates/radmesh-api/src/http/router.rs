//! Router construction and server host for the API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, Method, Request, header::CONTENT_TYPE},
    routing::{get, post},
};
use radmesh_config::ArchiveLimits;
use radmesh_core::MeshWorkflow;
use radmesh_telemetry::{Metrics, build_sha};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::constants::HEADER_REQUEST_ID;
use crate::http::dicoms::{list_meshes, list_regions};
use crate::http::health::{health, metrics};
use crate::http::meshes::{calculate_roi, fetch_roi_mesh, make_mesh};
use crate::http::telemetry::RouteMetricsLayer;
use crate::http::upload::{list_uploads, upload_archive};
use crate::state::ApiState;

/// Axum router wrapper that hosts the mesh API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Wire the workflow, metrics, and upload limits into a router.
    #[must_use]
    pub fn new(workflow: Arc<dyn MeshWorkflow>, telemetry: Metrics, limits: &ArchiveLimits) -> Self {
        let state = Arc::new(ApiState::new(
            workflow,
            telemetry.clone(),
            limits.spool_threshold_bytes,
        ));
        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE, HeaderName::from_static(HEADER_REQUEST_ID)]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(radmesh_telemetry::set_request_id_layer())
            .layer(radmesh_telemetry::propagate_request_id_layer())
            .layer(trace_layer)
            .layer(RouteMetricsLayer::new(telemetry));

        let router = Self::routes()
            .layer(DefaultBodyLimit::max(limits.max_upload_bytes))
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(state);

        Self { router }
    }

    fn routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route("/api/Upload", get(list_uploads).post(upload_archive))
            .route("/api/MakeMesh", post(make_mesh))
            .route(
                "/api/CalculateRoi/{meshName}",
                get(fetch_roi_mesh).post(calculate_roi),
            )
            .route("/api/UploadedDicoms", get(list_meshes))
            .route("/api/UploadedDicoms/{dicomName}/regions", get(list_regions))
    }

    /// Consume the server and return the bare router.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve the API on `addr` until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError`] if the listener cannot bind or the server loop stops.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        tracing::info!(%addr, "starting api");
        axum::serve(listener, self.router.into_make_service())
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }
}
