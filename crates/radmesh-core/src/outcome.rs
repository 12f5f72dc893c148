//! Structured results of remote mesh computations.

use std::time::Duration;

use serde_json::Value;

/// Body returned by the remote engine on success.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// `application/json` payload.
    Json(Value),
    /// Any textual payload.
    Text(String),
    /// Opaque payload, e.g. a synchronously returned mesh.
    Binary {
        /// Declared content type.
        content_type: String,
        /// Raw bytes.
        bytes: Vec<u8>,
    },
}

/// What happened to one dispatched computation. Never an error: every failure
/// mode of the remote peer is a distinct variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ComputationOutcome {
    /// 2xx with a well-formed (or empty) body.
    Completed {
        /// HTTP status.
        status: u16,
        /// Decoded body when present.
        body: Option<ResponseBody>,
    },
    /// Non-2xx answer from the peer.
    Rejected {
        /// HTTP status, surfaced verbatim.
        status: u16,
        /// Raw body text when present.
        body: Option<String>,
    },
    /// 2xx whose body could not be decoded as declared.
    MalformedResponse {
        /// HTTP status.
        status: u16,
        /// Decoder message.
        detail: String,
    },
    /// The peer could not be reached.
    Unreachable {
        /// Transport error message.
        detail: String,
    },
    /// No answer within the configured bound.
    TimedOut {
        /// Bound that elapsed.
        after: Duration,
    },
}

impl ComputationOutcome {
    /// True only for [`Self::Completed`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// HTTP status when the peer answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Completed { status, .. }
            | Self::Rejected { status, .. }
            | Self::MalformedResponse { status, .. } => Some(*status),
            Self::Unreachable { .. } | Self::TimedOut { .. } => None,
        }
    }

    /// Stable label used in logs, metrics, and responses.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Rejected { .. } => "rejected",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Unreachable { .. } => "unreachable",
            Self::TimedOut { .. } => "timed_out",
        }
    }

    /// Body rendered as JSON for inclusion in a response document.
    #[must_use]
    pub fn body_json(&self) -> Option<Value> {
        match self {
            Self::Completed {
                body: Some(ResponseBody::Json(value)),
                ..
            } => Some(value.clone()),
            Self::Completed {
                body: Some(ResponseBody::Text(text)),
                ..
            }
            | Self::Rejected {
                body: Some(text), ..
            } => Some(Value::String(text.clone())),
            Self::Completed {
                body: Some(ResponseBody::Binary { bytes, .. }),
                ..
            } => Some(Value::from(bytes.len())),
            Self::MalformedResponse { detail, .. } | Self::Unreachable { detail } => {
                Some(Value::String(detail.clone()))
            }
            _ => None,
        }
    }
}
