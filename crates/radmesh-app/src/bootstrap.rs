//! Service wiring: environment, logging, storage roots, and the HTTP server.

use std::sync::Arc;

use radmesh_api::ApiServer;
use radmesh_config::MeshConfig;
use radmesh_core::DicomRegionCatalog;
use radmesh_genie::GenieClient;
use radmesh_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::orchestrator::UploadOrchestrator;

/// Service name stamped on the process-wide span.
pub const SERVICE_NAME: &str = "radmesh";

/// Entry point for the radmesh boot sequence.
///
/// # Errors
///
/// Returns an error if configuration is incomplete or application startup fails.
pub async fn run_app() -> AppResult<()> {
    let config = MeshConfig::from_env().map_err(|err| AppError::config("config.from_env", err))?;
    run_app_with(config).await
}

/// Boot sequence driven by an already loaded configuration.
///
/// # Errors
///
/// Returns an error if logging, storage preparation, or the listener fails.
pub async fn run_app_with(config: MeshConfig) -> AppResult<()> {
    let logging = LoggingConfig {
        level: &config.logging.level,
        format: LogFormat::from_setting(config.logging.format.as_deref()),
        ..LoggingConfig::default()
    };
    radmesh_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new(SERVICE_NAME);

    info!(
        upload_dir = %config.storage.upload_dir.display(),
        genie = %config.remote.base_url,
        "radmesh bootstrap starting"
    );

    let telemetry =
        Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let server = build_server(&config, telemetry)?;

    let addr = config.http.socket_addr();
    info!(%addr, "radmesh api listening");
    server
        .serve(addr)
        .await
        .map_err(|err| AppError::api_server("api_server.serve", err))
}

/// Prepare the storage roots and assemble the API server.
///
/// # Errors
///
/// Returns an error if a storage directory cannot be created or a collaborator
/// fails to initialise.
pub fn build_server(config: &MeshConfig, telemetry: Metrics) -> AppResult<ApiServer> {
    for dir in [
        config.storage.upload_dir.clone(),
        config.storage.dicoms_root(),
        config.storage.roi_root(),
        config.storage.ct_root(),
    ] {
        std::fs::create_dir_all(&dir).map_err(|source| AppError::Io {
            operation: "storage.create_dir",
            path: dir.clone(),
            source,
        })?;
    }

    let engine = GenieClient::new(config.remote.base_url.clone(), config.remote.timeout)
        .map_err(|err| AppError::genie("genie.client", err))?;
    let orchestrator = UploadOrchestrator::new(
        config,
        Arc::new(engine),
        Arc::new(DicomRegionCatalog),
        telemetry.clone(),
    )
    .map_err(|err| AppError::fsops("orchestrator.new", err))?;

    Ok(ApiServer::new(
        Arc::new(orchestrator),
        telemetry,
        &config.limits,
    ))
}
