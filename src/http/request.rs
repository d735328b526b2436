//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Buffer the inbound body into a [`ProxyRequest`]
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Body size limits enforced by middleware before buffering finishes; a
//!   body that runs past the limit is 413 whether or not it declared a length

use axum::body::{Body, Bytes};
use axum::extract::FromRequest;
use axum::http::{HeaderValue, Request, StatusCode};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::dispatch::{GatewayError, ProxyRequest};

/// Header carrying the request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Read an inbound request into a [`ProxyRequest`].
pub async fn read_proxy_request(request: Request<Body>) -> Result<ProxyRequest, GatewayError> {
    let method = request.method().clone();
    let headers = request.headers().clone();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    // The body-limit layer bounds the stream; this only collects it.
    let body = Bytes::from_request(request, &()).await.map_err(|rejection| {
        tracing::warn!(path = %path_and_query, error = %rejection, "Failed to read request body");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            GatewayError::PayloadTooLarge
        } else {
            GatewayError::InvalidBody
        }
    })?;

    Ok(ProxyRequest {
        method,
        path_and_query,
        headers,
        body,
    })
}
