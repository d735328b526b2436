//! Client-facing failures produced by the gateway itself.

use axum::http::StatusCode;
use thiserror::Error;

use crate::dispatch::ProxyResponse;

/// Every way a request can fail at the gateway boundary.
///
/// Backend error responses are not listed: they are forwarded unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("no route")]
    NoRoute,

    #[error("service unavailable")]
    BreakerOpen,

    #[error("upstream timeout")]
    UpstreamTimeout,

    #[error("{0}")]
    UpstreamNetwork(String),

    #[error("invalid request path")]
    InvalidPath,

    #[error("invalid request body")]
    InvalidBody,

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("internal error")]
    Internal,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NoRoute => StatusCode::NOT_FOUND,
            GatewayError::BreakerOpen => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamNetwork(_) => StatusCode::BAD_GATEWAY,
            GatewayError::InvalidPath | GatewayError::InvalidBody => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::NoRoute => "no_route",
            GatewayError::BreakerOpen => "breaker_open",
            GatewayError::UpstreamTimeout => "upstream_timeout",
            GatewayError::UpstreamNetwork(_) => "upstream_network_error",
            GatewayError::InvalidPath => "invalid_path",
            GatewayError::InvalidBody => "invalid_body",
            GatewayError::PayloadTooLarge => "payload_too_large",
            GatewayError::Internal => "internal",
        }
    }
}

impl From<GatewayError> for ProxyResponse {
    fn from(err: GatewayError) -> Self {
        ProxyResponse::error(err.status(), &err.to_string())
    }
}
