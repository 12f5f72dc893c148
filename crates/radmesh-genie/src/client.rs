//! `MeshEngine` implementation over HTTP.
//!
//! # Design
//! - One POST per dispatch; retries belong to the orchestrator.
//! - Every transport or decoding failure becomes a `ComputationOutcome` variant.
//! - The request id of the inbound request, when present, is forwarded so both
//!   services log the same identifier.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use radmesh_core::{ComputationOutcome, MeshComputationRequest, MeshEngine, MeshKind, ResponseBody};
use radmesh_telemetry::current_request_id;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::error::{GenieError, GenieResult};

/// Header carrying the correlation identifier to the remote engine.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

const DEFAULT_BINARY_TYPE: &str = "application/octet-stream";

/// Client for the `MakeCtMesh` and `MakeRoiMesh` endpoints.
#[derive(Debug, Clone)]
pub struct GenieClient {
    http: Client,
    ct_url: Url,
    roi_url: Url,
    timeout: Duration,
}

impl GenieClient {
    /// Build a client rooted at `base_url` whose round trips are bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`GenieError`] when the HTTP client cannot be built or the base
    /// URL cannot carry endpoint paths.
    pub fn new(base_url: Url, timeout: Duration) -> GenieResult<Self> {
        let base = normalise_base(base_url)?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| GenieError::ClientBuild { source })?;
        Ok(Self {
            http,
            ct_url: join_endpoint(&base, MeshKind::Ct.endpoint())?,
            roi_url: join_endpoint(&base, MeshKind::Roi.endpoint())?,
            timeout,
        })
    }

    /// Absolute URL served for `kind`.
    #[must_use]
    pub const fn endpoint_url(&self, kind: MeshKind) -> &Url {
        match kind {
            MeshKind::Ct => &self.ct_url,
            MeshKind::Roi => &self.roi_url,
        }
    }

    /// Round-trip bound applied to every dispatch.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn transport_outcome(&self, err: &reqwest::Error) -> ComputationOutcome {
        if err.is_timeout() {
            ComputationOutcome::TimedOut {
                after: self.timeout,
            }
        } else {
            ComputationOutcome::Unreachable {
                detail: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl MeshEngine for GenieClient {
    async fn dispatch(&self, request: &MeshComputationRequest) -> ComputationOutcome {
        let endpoint = request.endpoint();
        let url = self.endpoint_url(request.kind()).clone();
        let started = Instant::now();

        let mut builder = self.http.post(url).json(request);
        if let Some(request_id) = current_request_id() {
            builder = builder.header(HEADER_REQUEST_ID, request_id);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                let outcome = self.transport_outcome(&err);
                warn!(endpoint, outcome = outcome.label(), error = %err, "remote dispatch failed");
                return outcome;
            }
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) if err.is_timeout() => return self.transport_outcome(&err),
            Err(err) => {
                return ComputationOutcome::MalformedResponse {
                    status: status.as_u16(),
                    detail: err.to_string(),
                };
            }
        };

        let outcome = classify(status, content_type.as_deref(), &bytes);
        debug!(
            endpoint,
            status = status.as_u16(),
            outcome = outcome.label(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "remote dispatch finished"
        );
        outcome
    }
}

fn normalise_base(mut base: Url) -> GenieResult<Url> {
    if base.cannot_be_a_base() {
        return Err(GenieError::BaseUrl {
            value: base.to_string(),
        });
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

fn join_endpoint(base: &Url, endpoint: &'static str) -> GenieResult<Url> {
    base.join(endpoint)
        .map_err(|source| GenieError::Endpoint { endpoint, source })
}

fn classify(status: StatusCode, content_type: Option<&str>, bytes: &[u8]) -> ComputationOutcome {
    let code = status.as_u16();
    if !status.is_success() {
        return ComputationOutcome::Rejected {
            status: code,
            body: (!bytes.is_empty()).then(|| String::from_utf8_lossy(bytes).into_owned()),
        };
    }
    if bytes.is_empty() {
        return ComputationOutcome::Completed {
            status: code,
            body: None,
        };
    }

    let mime = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase());
    let body = match mime.as_deref() {
        Some(mime) if mime == "application/json" || mime.ends_with("+json") => {
            serde_json::from_slice(bytes)
                .map(ResponseBody::Json)
                .map_err(|err| err.to_string())
        }
        Some(mime) if mime.starts_with("text/") => String::from_utf8(bytes.to_vec())
            .map(ResponseBody::Text)
            .map_err(|err| err.to_string()),
        Some(_) => Ok(ResponseBody::Binary {
            content_type: content_type.unwrap_or(DEFAULT_BINARY_TYPE).to_string(),
            bytes: bytes.to_vec(),
        }),
        None => Ok(sniff(bytes)),
    };

    match body {
        Ok(body) => ComputationOutcome::Completed {
            status: code,
            body: Some(body),
        },
        Err(detail) => ComputationOutcome::MalformedResponse {
            status: code,
            detail,
        },
    }
}

fn sniff(bytes: &[u8]) -> ResponseBody {
    if let Ok(value) = serde_json::from_slice(bytes) {
        return ResponseBody::Json(value);
    }
    match String::from_utf8(bytes.to_vec()) {
        Ok(text) => ResponseBody::Text(text),
        Err(_) => ResponseBody::Binary {
            content_type: DEFAULT_BINARY_TYPE.to_string(),
            bytes: bytes.to_vec(),
        },
    }
}
