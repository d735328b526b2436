//! Classification of a single upstream call.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};

/// Result of one call to a backend, as seen by the dispatcher and breaker.
#[derive(Debug, Clone)]
pub enum CallOutcome {
    /// Backend answered with a status below 500.
    Success {
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    },
    /// Backend answered with a 5xx status.
    BackendError {
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    },
    /// No complete response before the deadline.
    Timeout,
    /// Connection-level failure (DNS, refused, reset, truncated body).
    NetworkError { message: String },
    /// The breaker refused the call; the backend was never contacted.
    Rejected,
}

impl CallOutcome {
    /// Classify a complete response by status.
    pub fn from_response(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        if status.is_server_error() {
            CallOutcome::BackendError { status, headers, body }
        } else {
            CallOutcome::Success { status, headers, body }
        }
    }

    /// Whether this outcome counts against the backend in the breaker window.
    ///
    /// Statuses below 500 are answers, not failures: a 404 means the backend
    /// is working and the resource is absent.
    pub fn is_failure(&self) -> bool {
        match self {
            CallOutcome::Success { .. } | CallOutcome::Rejected => false,
            CallOutcome::BackendError { status, .. } => status.is_server_error(),
            CallOutcome::Timeout | CallOutcome::NetworkError { .. } => true,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CallOutcome::Success { .. } => "success",
            CallOutcome::BackendError { .. } => "backend_error",
            CallOutcome::Timeout => "timeout",
            CallOutcome::NetworkError { .. } => "network_error",
            CallOutcome::Rejected => "rejected",
        }
    }
}
