//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Counters follow the upload pipeline: requests, uploads, stages, dispatches.

use std::convert::TryFrom;
use std::sync::Arc;
use std::time::Duration;

use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    uploads_total: IntCounterVec,
    pipeline_stages_total: IntCounterVec,
    mesh_dispatch_total: IntCounterVec,
    uploads_in_flight: IntGauge,
    remote_latency_ms: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Uploads currently moving through the pipeline.
    pub uploads_in_flight: i64,
    /// Latency (ms) of the most recent remote dispatch.
    pub remote_latency_ms: i64,
    /// Uploads that completed successfully.
    pub uploads_succeeded_total: u64,
    /// Uploads that failed at any stage.
    pub uploads_failed_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = counter_vec(
            "http_requests_total",
            "Total HTTP requests received",
            &["route", "code"],
        )?;
        let uploads_total = counter_vec(
            "uploads_total",
            "Archive uploads processed by outcome",
            &["outcome"],
        )?;
        let pipeline_stages_total = counter_vec(
            "pipeline_stages_total",
            "Upload pipeline stages executed by status",
            &["stage", "status"],
        )?;
        let mesh_dispatch_total = counter_vec(
            "mesh_dispatch_total",
            "Mesh computation requests sent to the remote engine",
            &["endpoint", "outcome"],
        )?;
        let uploads_in_flight = gauge("uploads_in_flight", "Uploads currently in progress")?;
        let remote_latency_ms = gauge(
            "remote_latency_ms",
            "Latency of the most recent remote mesh request (ms)",
        )?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(&registry, "uploads_total", &uploads_total)?;
        register(&registry, "pipeline_stages_total", &pipeline_stages_total)?;
        register(&registry, "mesh_dispatch_total", &mesh_dispatch_total)?;
        register(&registry, "uploads_in_flight", &uploads_in_flight)?;
        register(&registry, "remote_latency_ms", &remote_latency_ms)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                uploads_total,
                pipeline_stages_total,
                mesh_dispatch_total,
                uploads_in_flight,
                remote_latency_ms,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        let code = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[route, code.as_str()])
            .inc();
    }

    /// Increment the upload counter for the final outcome (`success` / `failure`).
    pub fn inc_upload(&self, outcome: &str) {
        self.inner.uploads_total.with_label_values(&[outcome]).inc();
    }

    /// Increment the pipeline stage counter.
    pub fn inc_pipeline_stage(&self, stage: &str, status: &str) {
        self.inner
            .pipeline_stages_total
            .with_label_values(&[stage, status])
            .inc();
    }

    /// Increment the remote dispatch counter.
    pub fn inc_mesh_dispatch(&self, endpoint: &str, outcome: &str) {
        self.inner
            .mesh_dispatch_total
            .with_label_values(&[endpoint, outcome])
            .inc();
    }

    /// Mark an upload as entering the pipeline.
    pub fn upload_started(&self) {
        self.inner.uploads_in_flight.inc();
    }

    /// Mark an upload as leaving the pipeline.
    pub fn upload_finished(&self) {
        self.inner.uploads_in_flight.dec();
    }

    /// Record the latency of a remote dispatch.
    pub fn observe_remote_latency(&self, duration: Duration) {
        self.inner
            .remote_latency_ms
            .set(Self::duration_to_ms(duration));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uploads_in_flight: self.inner.uploads_in_flight.get(),
            remote_latency_ms: self.inner.remote_latency_ms.get(),
            uploads_succeeded_total: self
                .inner
                .uploads_total
                .with_label_values(&["success"])
                .get(),
            uploads_failed_total: self
                .inner
                .uploads_total
                .with_label_values(&["failure"])
                .get(),
        }
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn gauge(name: &'static str, help: &str) -> Result<IntGauge> {
    IntGauge::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
