//! Upload orchestrator that drives archives through unpack, validation, and
//! optional mesh dispatch, and serves the workspace queries.
//!
//! # Design
//! - One workspace name is handled by at most one upload at a time; the lock
//!   spans unpack, validation, and the final swap into place.
//! - Archives are validated while staged, so a rejected re-upload never
//!   disturbs the workspace it would have replaced.
//! - Filesystem and DICOM work runs on the blocking pool.
//! - Only unreachable peers are retried; timeouts and remote statuses are final.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use radmesh_config::{InvalidEntryPolicy, MeshConfig, RemoteConfig};
use radmesh_core::{
    ComputationOutcome, MeshComputationRequest, MeshDispatch, MeshEngine, MeshJob,
    MeshRequestBuilder, MeshWorkflow, PipelineError, PipelineResult, PipelineStage, RegionCatalog,
    RegionName, UploadOptions, UploadOutcome,
};
use radmesh_fsops::{
    ArchiveUnpacker, ArchiveValidator, FsOpsError, FsOpsResult, MeshName, RoiVariant,
    StagedWorkspace, StorageLayout, UploadedArchive, UploadsListing, WorkspaceLocks, run_blocking,
};
use radmesh_telemetry::Metrics;
use tracing::{info, warn};

const STATUS_SUCCESS: &str = "success";
const STATUS_FAILURE: &str = "failure";

/// Concrete [`MeshWorkflow`] over the local workspace tree and a remote engine.
pub struct UploadOrchestrator {
    layout: StorageLayout,
    unpacker: ArchiveUnpacker,
    validator: ArchiveValidator,
    policy: InvalidEntryPolicy,
    remote: RemoteConfig,
    engine: Arc<dyn MeshEngine>,
    catalog: Arc<dyn RegionCatalog>,
    locks: WorkspaceLocks,
    telemetry: Metrics,
}

impl UploadOrchestrator {
    /// Build an orchestrator from configuration and its collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Pattern`] if the DICOM naming pattern cannot be compiled.
    pub fn new(
        config: &MeshConfig,
        engine: Arc<dyn MeshEngine>,
        catalog: Arc<dyn RegionCatalog>,
        telemetry: Metrics,
    ) -> FsOpsResult<Self> {
        let layout = StorageLayout::new(&config.storage);
        Ok(Self {
            unpacker: ArchiveUnpacker::new(layout.dicoms_root(), config.limits),
            validator: ArchiveValidator::from_config(&config.validation)?,
            policy: config.validation.on_invalid,
            remote: config.remote.clone(),
            layout,
            engine,
            catalog,
            locks: WorkspaceLocks::new(),
            telemetry,
        })
    }

    /// Storage layout the orchestrator writes to.
    #[must_use]
    pub const fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    async fn run_upload(&self, archive: UploadedArchive, options: UploadOptions) -> UploadOutcome {
        let root = self.layout.dicoms_root().to_path_buf();
        let mesh_name = match MeshName::from_archive_filename(archive.declared_filename()) {
            Ok(mesh_name) => mesh_name,
            Err(err) => return self.fail(PipelineStage::Received, None, root, err.into()),
        };
        self.record_stage(PipelineStage::Received, STATUS_SUCCESS);

        let guard = self.locks.acquire(&mesh_name).await;

        let unpacker = self.unpacker.clone();
        let name = mesh_name.clone();
        let staged =
            match run_blocking("upload.unpack", move || unpacker.stage_as(&name, archive)).await {
                Ok(staged) => staged,
                Err(err) => {
                    return self.fail(PipelineStage::Received, Some(mesh_name), root, err.into());
                }
            };
        self.record_stage(PipelineStage::Unpacked, STATUS_SUCCESS);

        let validator = self.validator.clone();
        let target = staged.target().to_path_buf();
        let (staged, report) = match run_blocking("upload.validate", move || {
            let report = validator.validate(staged.path())?;
            Ok((staged, report))
        })
        .await
        {
            Ok(checked) => checked,
            Err(err) => {
                return self.fail(PipelineStage::Unpacked, Some(mesh_name), target, err.into());
            }
        };

        let mut warnings = Vec::new();
        if !report.is_valid() {
            let invalid_entries = report.into_invalid_entries();
            match self.policy {
                InvalidEntryPolicy::Reject => {
                    discard_staged(staged).await;
                    drop(guard);
                    warn!(
                        mesh_name = %mesh_name,
                        invalid = invalid_entries.len(),
                        "upload rejected by naming policy"
                    );
                    return self.fail(
                        PipelineStage::Rejected,
                        Some(mesh_name),
                        root,
                        PipelineError::ValidationFailed { invalid_entries },
                    );
                }
                InvalidEntryPolicy::Warn => {
                    warn!(
                        mesh_name = %mesh_name,
                        invalid = invalid_entries.len(),
                        "upload kept despite invalid entries"
                    );
                    warnings = invalid_entries;
                }
            }
        }

        let unpacked = match run_blocking("upload.commit", move || staged.commit()).await {
            Ok(unpacked) => unpacked,
            Err(err) => {
                return self.fail(PipelineStage::Unpacked, Some(mesh_name), target, err.into());
            }
        };
        drop(guard);
        self.record_stage(PipelineStage::Validated, STATUS_SUCCESS);
        info!(
            mesh_name = %mesh_name,
            files = unpacked.files_written,
            bytes = unpacked.bytes_written,
            stage = PipelineStage::Validated.as_str(),
            "upload validated"
        );

        if !options.start_computation {
            return UploadOutcome::success(PipelineStage::Validated, mesh_name, unpacked.path)
                .with_warnings(warnings);
        }

        let job = MeshJob::Ct {
            mesh_name: mesh_name.clone(),
        };
        match self.make_mesh(job).await {
            Ok(dispatch) => {
                let summary = dispatch.summary();
                let outcome =
                    match PipelineError::from_outcome(&dispatch.outcome, dispatch.attempts) {
                        None => {
                            self.record_stage(PipelineStage::Dispatched, STATUS_SUCCESS);
                            UploadOutcome::success(
                                PipelineStage::Dispatched,
                                mesh_name,
                                unpacked.path,
                            )
                        }
                        Some(err) => self.fail(
                            PipelineStage::Dispatched,
                            Some(mesh_name),
                            unpacked.path,
                            err,
                        ),
                    };
                outcome.with_warnings(warnings).with_computation(summary)
            }
            Err(err) => self
                .fail(
                    PipelineStage::Validated,
                    Some(mesh_name),
                    unpacked.path,
                    err,
                )
                .with_warnings(warnings),
        }
    }

    fn fail(
        &self,
        stage: PipelineStage,
        mesh_name: Option<MeshName>,
        path: PathBuf,
        error: PipelineError,
    ) -> UploadOutcome {
        self.record_stage(stage, STATUS_FAILURE);
        warn!(
            mesh_name = mesh_name.as_ref().map(MeshName::as_str),
            stage = stage.as_str(),
            error_kind = error.kind(),
            error = %error,
            "upload failed"
        );
        UploadOutcome::failure(stage, mesh_name, path, error)
    }

    fn record_stage(&self, stage: PipelineStage, status: &str) {
        self.telemetry.inc_pipeline_stage(stage.as_str(), status);
    }

    async fn require_workspace(&self, mesh_name: &MeshName) -> PipelineResult<PathBuf> {
        let workspace = self.layout.workspace(mesh_name);
        match tokio::fs::metadata(&workspace).await {
            Ok(metadata) if metadata.is_dir() => Ok(workspace),
            _ => Err(PipelineError::UnknownWorkspace {
                mesh_name: mesh_name.to_string(),
            }),
        }
    }

    async fn dispatch(&self, request: MeshComputationRequest) -> MeshDispatch {
        let endpoint = request.endpoint();
        let max_attempts = self.remote.max_attempts.max(1);
        let mut attempts = 0;
        let outcome = loop {
            attempts += 1;
            let started = Instant::now();
            let outcome =
                match tokio::time::timeout(self.remote.timeout, self.engine.dispatch(&request))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => ComputationOutcome::TimedOut {
                        after: self.remote.timeout,
                    },
                };
            self.telemetry.observe_remote_latency(started.elapsed());
            self.telemetry.inc_mesh_dispatch(endpoint, outcome.label());

            if matches!(outcome, ComputationOutcome::Unreachable { .. }) && attempts < max_attempts
            {
                warn!(endpoint, attempt = attempts, max_attempts, "remote unreachable; retrying");
                continue;
            }
            break outcome;
        };
        info!(
            endpoint,
            outcome = outcome.label(),
            status = outcome.status(),
            attempts,
            "mesh dispatch finished"
        );
        MeshDispatch {
            kind: request.kind(),
            save_to: primary_output(&request).to_path_buf(),
            outcome,
            attempts,
        }
    }
}

#[async_trait]
impl MeshWorkflow for UploadOrchestrator {
    async fn upload(&self, archive: UploadedArchive, options: UploadOptions) -> UploadOutcome {
        self.telemetry.upload_started();
        let outcome = self.run_upload(archive, options).await;
        self.telemetry.upload_finished();
        self.telemetry.inc_upload(if outcome.is_success() {
            STATUS_SUCCESS
        } else {
            STATUS_FAILURE
        });
        outcome
    }

    async fn make_mesh(&self, job: MeshJob) -> PipelineResult<MeshDispatch> {
        let mesh_name = job.mesh_name().clone();
        self.require_workspace(&mesh_name).await?;

        let inputs = self.layout.dicom_layout(&mesh_name);
        let check = inputs.clone();
        run_blocking("mesh.inputs", move || check.ensure_complete()).await?;

        let builder = MeshRequestBuilder::new(&inputs);
        let request = match &job {
            MeshJob::Ct { .. } => {
                MeshComputationRequest::Ct(builder.ct_request(self.layout.ct_mesh_path(&mesh_name)))
            }
            MeshJob::Roi { region, .. } => MeshComputationRequest::Roi(builder.roi_request(
                self.layout
                    .roi_mesh_path(&mesh_name, &region.file_stem(), RoiVariant::Base),
                region.as_str(),
            )?),
        };
        prepare_outputs(&request).await?;
        Ok(self.dispatch(request).await)
    }

    async fn list_workspaces(&self) -> PipelineResult<Vec<MeshName>> {
        let layout = self.layout.clone();
        Ok(run_blocking("layout.list_workspaces", move || layout.list_workspaces()).await?)
    }

    async fn list_regions(&self, mesh_name: &MeshName) -> PipelineResult<Vec<RegionName>> {
        self.require_workspace(mesh_name).await?;
        let struct_file = self
            .layout
            .dicom_layout(mesh_name)
            .struct_file()
            .to_path_buf();
        let catalog = Arc::clone(&self.catalog);
        let regions = run_blocking("regions.list", move || {
            Ok(catalog.list_regions(&struct_file))
        })
        .await??;
        Ok(regions)
    }

    async fn uploads_summary(&self) -> PipelineResult<UploadsListing> {
        let layout = self.layout.clone();
        Ok(run_blocking("layout.list_uploads", move || layout.list_uploads()).await?)
    }

    fn roi_mesh_path(
        &self,
        mesh_name: &MeshName,
        region: &RegionName,
        variant: RoiVariant,
    ) -> PathBuf {
        self.layout
            .roi_mesh_path(mesh_name, &region.file_stem(), variant)
    }
}

fn primary_output(request: &MeshComputationRequest) -> &Path {
    match request {
        MeshComputationRequest::Ct(ct) => &ct.save_to,
        MeshComputationRequest::Roi(roi) => &roi.base.save_to,
    }
}

async fn prepare_outputs(request: &MeshComputationRequest) -> PipelineResult<()> {
    for output in request.outputs() {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| FsOpsError::io("mesh.prepare_output", parent, source))?;
        }
    }
    Ok(())
}

async fn discard_staged(staged: StagedWorkspace) {
    let path = staged.path().to_path_buf();
    if let Err(err) = run_blocking("upload.discard", move || staged.discard()).await {
        warn!(path = %path.display(), error = %err, "failed to remove rejected upload");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use radmesh_config::{StorageConfig, ValidationConfig};
    use radmesh_core::{CoreError, CoreResult, OutcomeStatus, ResponseBody};
    use radmesh_test_support::{TestUploads, plan_archive, zip_archive};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct ScriptedEngine {
        script: Mutex<VecDeque<ComputationOutcome>>,
        requests: Mutex<Vec<MeshComputationRequest>>,
        delay: Option<Duration>,
    }

    impl ScriptedEngine {
        fn answering(outcomes: impl IntoIterator<Item = ComputationOutcome>) -> Self {
            Self {
                script: Mutex::new(outcomes.into_iter().collect()),
                ..Self::default()
            }
        }

        fn requests(&self) -> Vec<MeshComputationRequest> {
            self.requests
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        }
    }

    #[async_trait]
    impl MeshEngine for ScriptedEngine {
        async fn dispatch(&self, request: &MeshComputationRequest) -> ComputationOutcome {
            self.requests
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.script
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .pop_front()
                .unwrap_or(ComputationOutcome::Completed {
                    status: 200,
                    body: None,
                })
        }
    }

    struct FixedCatalog(Vec<&'static str>);

    impl RegionCatalog for FixedCatalog {
        fn list_regions(&self, struct_file: &Path) -> CoreResult<Vec<RegionName>> {
            if !struct_file.is_file() {
                return Err(CoreError::UnreadableStructureSet {
                    path: struct_file.to_path_buf(),
                    reason: "missing",
                    source: None,
                });
            }
            self.0.iter().map(|name| RegionName::parse(name)).collect()
        }
    }

    fn config(uploads: &TestUploads) -> Result<MeshConfig> {
        let root = uploads.path().display().to_string();
        Ok(MeshConfig::from_lookup(|key| {
            (key == "UPLOAD_DIR").then(|| root.clone())
        })?)
    }

    fn orchestrator(config: &MeshConfig, engine: Arc<ScriptedEngine>) -> Result<UploadOrchestrator> {
        Ok(UploadOrchestrator::new(
            config,
            engine,
            Arc::new(FixedCatalog(vec!["spinal_cord", "heart"])),
            Metrics::new()?,
        )?)
    }

    fn archive(name: &str, bytes: &[u8]) -> Result<UploadedArchive> {
        Ok(UploadedArchive::from_bytes(name, bytes, 1024)?)
    }

    #[test]
    fn relative_upload_dir_yields_absolute_layout() -> Result<()> {
        let config = MeshConfig::from_lookup(|key| {
            (key == "UPLOAD_DIR").then(|| "uploads".to_string())
        })?;
        let orchestrator = orchestrator(&config, Arc::new(ScriptedEngine::default()))?;
        let layout = orchestrator.layout();
        assert!(layout.dicoms_root().is_absolute());
        assert_eq!(
            layout.dicoms_root(),
            std::env::current_dir()?.join("uploads/dicoms")
        );
        Ok(())
    }

    #[tokio::test]
    async fn plan_upload_creates_workspace() -> Result<()> {
        let uploads = TestUploads::new()?;
        let config = config(&uploads)?;
        let engine = Arc::new(ScriptedEngine::default());
        let orchestrator = orchestrator(&config, engine.clone())?;

        let outcome = orchestrator
            .upload(archive("plan42.zip", &plan_archive(&[])?)?, UploadOptions::default())
            .await;

        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(outcome.stage, PipelineStage::Validated);
        assert_eq!(outcome.message, "files saved to path");
        let workspace = uploads.dicoms_root().join("plan42");
        assert_eq!(outcome.path_absolute, workspace);
        assert!(workspace.join("ctFiles/1.dcm").is_file());
        assert!(workspace.join("rtStructFile/0.dcm").is_file());
        assert!(engine.requests().is_empty());

        let names = orchestrator.list_workspaces().await?;
        assert_eq!(names, vec![MeshName::parse("plan42")?]);
        Ok(())
    }

    #[tokio::test]
    async fn traversal_archive_writes_nothing() -> Result<()> {
        let uploads = TestUploads::new()?;
        let config = config(&uploads)?;
        let orchestrator = orchestrator(&config, Arc::new(ScriptedEngine::default()))?;

        let bytes = zip_archive(&[("../../etc/passwd", b"root:x:0:0")])?;
        let outcome = orchestrator
            .upload(archive("evil.zip", &bytes)?, UploadOptions::default())
            .await;

        assert_eq!(outcome.status, OutcomeStatus::Failure);
        assert_eq!(outcome.stage, PipelineStage::Received);
        assert!(matches!(
            outcome.error,
            Some(PipelineError::PathTraversalAttempt { .. })
        ));
        assert!(!uploads.dicoms_root().join("evil").exists());
        assert!(!uploads.path().join("etc").exists());
        assert!(orchestrator.list_workspaces().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn invalid_entries_are_rejected_by_default() -> Result<()> {
        let uploads = TestUploads::new()?;
        let config = config(&uploads)?;
        let orchestrator = orchestrator(&config, Arc::new(ScriptedEngine::default()))?;

        let bytes = plan_archive(&[("notes.txt", b"hello")])?;
        let outcome = orchestrator
            .upload(archive("plan42.zip", &bytes)?, UploadOptions::default())
            .await;

        assert_eq!(outcome.status, OutcomeStatus::Failure);
        assert_eq!(outcome.stage, PipelineStage::Rejected);
        assert_eq!(outcome.invalid_entries, vec!["notes.txt".to_string()]);
        assert_eq!(outcome.error_kind, Some("validation_failed"));
        assert!(!uploads.dicoms_root().join("plan42").exists());
        Ok(())
    }

    #[tokio::test]
    async fn rejected_reupload_keeps_prior_workspace() -> Result<()> {
        let uploads = TestUploads::new()?;
        let config = config(&uploads)?;
        let orchestrator = orchestrator(&config, Arc::new(ScriptedEngine::default()))?;

        let first = orchestrator
            .upload(archive("plan42.zip", &plan_archive(&[])?)?, UploadOptions::default())
            .await;
        assert!(first.is_success());

        let bytes = plan_archive(&[("notes.txt", b"hello")])?;
        let second = orchestrator
            .upload(archive("plan42.zip", &bytes)?, UploadOptions::default())
            .await;
        assert_eq!(second.stage, PipelineStage::Rejected);
        assert_eq!(second.invalid_entries, vec!["notes.txt".to_string()]);

        let workspace = uploads.dicoms_root().join("plan42");
        assert!(workspace.join("ctFiles/1.dcm").is_file());
        assert!(!workspace.join("notes.txt").exists());
        let mut children = Vec::new();
        for entry in std::fs::read_dir(uploads.dicoms_root())? {
            children.push(entry?.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(children, vec!["plan42".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn warn_policy_keeps_workspace() -> Result<()> {
        let uploads = TestUploads::new()?;
        let mut config = config(&uploads)?;
        config.validation = ValidationConfig {
            on_invalid: InvalidEntryPolicy::Warn,
            ..config.validation
        };
        let orchestrator = orchestrator(&config, Arc::new(ScriptedEngine::default()))?;

        let bytes = plan_archive(&[("notes.txt", b"hello")])?;
        let outcome = orchestrator
            .upload(archive("plan42.zip", &bytes)?, UploadOptions::default())
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.warnings, vec!["notes.txt".to_string()]);
        assert!(outcome.invalid_entries.is_empty());
        assert!(uploads.dicoms_root().join("plan42/notes.txt").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn start_computation_dispatches_ct_mesh() -> Result<()> {
        let uploads = TestUploads::new()?;
        let config = config(&uploads)?;
        let engine = Arc::new(ScriptedEngine::answering([ComputationOutcome::Completed {
            status: 200,
            body: Some(ResponseBody::Json(json!({"saved": true}))),
        }]));
        let orchestrator = orchestrator(&config, engine.clone())?;

        let outcome = orchestrator
            .upload(
                archive("plan42.zip", &plan_archive(&[])?)?,
                UploadOptions {
                    start_computation: true,
                },
            )
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.stage, PipelineStage::Dispatched);
        let computation = outcome
            .computation
            .ok_or_else(|| anyhow::anyhow!("computation summary missing"))?;
        assert_eq!(computation.status, Some(200));
        assert_eq!(computation.endpoint, "MakeCtMesh");

        let requests = engine.requests();
        let [MeshComputationRequest::Ct(request)] = requests.as_slice() else {
            anyhow::bail!("expected one CT request, got {requests:?}");
        };
        let workspace = uploads.dicoms_root().join("plan42");
        assert_eq!(request.ct_fname, workspace.join("ctFiles"));
        assert_eq!(request.dose_fname, workspace.join("rtDoseFile/0.dcm"));
        assert_eq!(request.rs_fname, workspace.join("rtStructFile/0.dcm"));
        assert_eq!(request.save_to, uploads.path().join("CT/plan42/plan42.obj"));
        assert!(uploads.path().join("CT/plan42").is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn remote_failure_status_is_preserved() -> Result<()> {
        let uploads = TestUploads::new()?;
        let config = config(&uploads)?;
        let engine = Arc::new(ScriptedEngine::answering([ComputationOutcome::Rejected {
            status: 500,
            body: Some("mesh failed".into()),
        }]));
        let orchestrator = orchestrator(&config, engine)?;

        let outcome = orchestrator
            .upload(
                archive("plan42.zip", &plan_archive(&[])?)?,
                UploadOptions {
                    start_computation: true,
                },
            )
            .await;

        assert_eq!(outcome.status, OutcomeStatus::Failure);
        assert_eq!(outcome.stage, PipelineStage::Dispatched);
        assert!(matches!(
            outcome.error,
            Some(PipelineError::RemoteError { status: 500, .. })
        ));
        assert!(uploads.dicoms_root().join("plan42").is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn roi_job_derives_hot_and_cold_outputs() -> Result<()> {
        let uploads = TestUploads::new()?;
        uploads.plan_workspace("plan42")?;
        let config = config(&uploads)?;
        let engine = Arc::new(ScriptedEngine::default());
        let orchestrator = orchestrator(&config, engine.clone())?;

        let job = MeshJob::Roi {
            mesh_name: MeshName::parse("plan42")?,
            region: RegionName::parse("spinal_cord")?,
        };
        let dispatch = orchestrator.make_mesh(job).await?;
        assert!(dispatch.outcome.is_success());

        let requests = engine.requests();
        let [MeshComputationRequest::Roi(request)] = requests.as_slice() else {
            anyhow::bail!("expected one ROI request, got {requests:?}");
        };
        let roi_dir = uploads.path().join("ROI/plan42");
        assert_eq!(request.base.save_to, roi_dir.join("spinal_cord.obj"));
        assert_eq!(request.save_hot, roi_dir.join("spinal_cord_hot.obj"));
        assert_eq!(request.save_cold, roi_dir.join("spinal_cord_cold.obj"));
        assert_eq!(
            orchestrator.roi_mesh_path(
                &MeshName::parse("plan42")?,
                &RegionName::parse("spinal_cord")?,
                RoiVariant::Cold
            ),
            roi_dir.join("spinal_cord_cold.obj")
        );
        Ok(())
    }

    #[tokio::test]
    async fn roi_names_with_separators_keep_outputs_in_workspace() -> Result<()> {
        let uploads = TestUploads::new()?;
        uploads.plan_workspace("plan42")?;
        let config = config(&uploads)?;
        let engine = Arc::new(ScriptedEngine::default());
        let orchestrator = orchestrator(&config, engine.clone())?;

        let region = RegionName::parse("PTV 50/60")?;
        let job = MeshJob::Roi {
            mesh_name: MeshName::parse("plan42")?,
            region: region.clone(),
        };
        orchestrator.make_mesh(job).await?;

        let requests = engine.requests();
        let [MeshComputationRequest::Roi(request)] = requests.as_slice() else {
            anyhow::bail!("expected one ROI request, got {requests:?}");
        };
        let roi_dir = uploads.path().join("ROI/plan42");
        assert_eq!(request.roi_name.as_str(), "PTV 50/60");
        assert_eq!(request.base.save_to, roi_dir.join("PTV 50_60.obj"));
        assert_eq!(request.save_hot, roi_dir.join("PTV 50_60_hot.obj"));
        assert_eq!(
            orchestrator.roi_mesh_path(&MeshName::parse("plan42")?, &region, RoiVariant::Base),
            roi_dir.join("PTV 50_60.obj")
        );
        Ok(())
    }

    #[tokio::test]
    async fn unknown_and_incomplete_workspaces_fail_before_dispatch() -> Result<()> {
        let uploads = TestUploads::new()?;
        radmesh_test_support::write_workspace(
            &uploads.dicoms_root().join("partial"),
            &[("ctFiles/1.dcm", b"DICM")],
        )?;
        let config = config(&uploads)?;
        let engine = Arc::new(ScriptedEngine::default());
        let orchestrator = orchestrator(&config, engine.clone())?;

        let unknown = orchestrator
            .make_mesh(MeshJob::Ct {
                mesh_name: MeshName::parse("plan99")?,
            })
            .await;
        assert!(matches!(unknown, Err(PipelineError::UnknownWorkspace { .. })));

        let partial = orchestrator
            .make_mesh(MeshJob::Ct {
                mesh_name: MeshName::parse("partial")?,
            })
            .await;
        assert!(matches!(
            partial,
            Err(PipelineError::MissingWorkspaceFile { .. })
        ));
        assert!(engine.requests().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_peer_is_retried_up_to_limit() -> Result<()> {
        let uploads = TestUploads::new()?;
        uploads.plan_workspace("plan42")?;
        let mut config = config(&uploads)?;
        config.remote.max_attempts = 3;
        let unreachable = || ComputationOutcome::Unreachable {
            detail: "connection refused".into(),
        };
        let engine = Arc::new(ScriptedEngine::answering([
            unreachable(),
            unreachable(),
            ComputationOutcome::Completed {
                status: 200,
                body: None,
            },
        ]));
        let orchestrator = orchestrator(&config, engine.clone())?;

        let dispatch = orchestrator
            .make_mesh(MeshJob::Ct {
                mesh_name: MeshName::parse("plan42")?,
            })
            .await?;
        assert!(dispatch.outcome.is_success());
        assert_eq!(dispatch.attempts, 3);
        assert_eq!(engine.requests().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn remote_statuses_are_never_retried() -> Result<()> {
        let uploads = TestUploads::new()?;
        uploads.plan_workspace("plan42")?;
        let mut config = config(&uploads)?;
        config.remote.max_attempts = 3;
        let engine = Arc::new(ScriptedEngine::answering([ComputationOutcome::Rejected {
            status: 503,
            body: None,
        }]));
        let orchestrator = orchestrator(&config, engine.clone())?;

        let dispatch = orchestrator
            .make_mesh(MeshJob::Ct {
                mesh_name: MeshName::parse("plan42")?,
            })
            .await?;
        assert_eq!(dispatch.outcome.status(), Some(503));
        assert_eq!(dispatch.attempts, 1);
        assert_eq!(engine.requests().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn slow_engine_times_out() -> Result<()> {
        let uploads = TestUploads::new()?;
        uploads.plan_workspace("plan42")?;
        let mut config = config(&uploads)?;
        config.remote.timeout = Duration::from_millis(50);
        config.remote.max_attempts = 3;
        let engine = Arc::new(ScriptedEngine {
            delay: Some(Duration::from_secs(5)),
            ..ScriptedEngine::default()
        });
        let orchestrator = orchestrator(&config, engine.clone())?;

        let dispatch = orchestrator
            .make_mesh(MeshJob::Ct {
                mesh_name: MeshName::parse("plan42")?,
            })
            .await?;
        assert_eq!(
            dispatch.outcome,
            ComputationOutcome::TimedOut {
                after: Duration::from_millis(50)
            }
        );
        assert_eq!(dispatch.attempts, 1);
        Ok(())
    }

    #[tokio::test]
    async fn regions_come_from_the_catalog() -> Result<()> {
        let uploads = TestUploads::new()?;
        uploads.plan_workspace("plan42")?;
        let config = config(&uploads)?;
        let orchestrator = orchestrator(&config, Arc::new(ScriptedEngine::default()))?;

        let regions = orchestrator
            .list_regions(&MeshName::parse("plan42")?)
            .await?;
        let names: Vec<&str> = regions.iter().map(RegionName::as_str).collect();
        assert_eq!(names, vec!["spinal_cord", "heart"]);

        let unknown = orchestrator
            .list_regions(&MeshName::parse("plan99")?)
            .await;
        assert!(matches!(unknown, Err(PipelineError::UnknownWorkspace { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_same_name_uploads_leave_one_complete_workspace() -> Result<()> {
        let uploads = TestUploads::new()?;
        let config = config(&uploads)?;
        let orchestrator = Arc::new(orchestrator(&config, Arc::new(ScriptedEngine::default()))?);

        let first = plan_archive(&[("ctFiles/2.dcm", b"DICM")])?;
        let second = plan_archive(&[("ctFiles/3.dcm", b"DICM")])?;
        let (a, b) = tokio::join!(
            orchestrator.upload(archive("plan42.zip", &first)?, UploadOptions::default()),
            orchestrator.upload(archive("plan42.zip", &second)?, UploadOptions::default()),
        );
        assert!(a.is_success());
        assert!(b.is_success());

        let ct_dir = uploads.dicoms_root().join("plan42/ctFiles");
        let two = ct_dir.join("2.dcm").is_file();
        let three = ct_dir.join("3.dcm").is_file();
        assert!(two ^ three, "workspace must hold exactly one upload");
        assert_eq!(orchestrator.list_workspaces().await?.len(), 1);

        let summary = orchestrator.uploads_summary().await?;
        assert_eq!(summary.entries, vec!["plan42".to_string()]);
        Ok(())
    }

    #[test]
    fn storage_defaults_place_meshes_under_upload_dir() {
        let storage = StorageConfig::with_upload_dir("/srv/uploads");
        let layout = StorageLayout::new(&storage);
        let name = MeshName::parse("plan42");
        assert!(name.is_ok());
        if let Ok(name) = name {
            assert_eq!(
                layout.ct_mesh_path(&name),
                PathBuf::from("/srv/uploads/CT/plan42/plan42.obj")
            );
        }
    }
}
