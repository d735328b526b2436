//! Per-request orchestration.
//!
//! # Responsibilities
//! - Resolve the backend for a request path
//! - Rewrite the path for forwarding
//! - Ask the backend's breaker for permission
//! - Run the upstream call and report its outcome
//! - Render the outcome as a client response
//!
//! # Design Decisions
//! - Every failure becomes a `ProxyResponse`; nothing propagates as an error
//! - The outcome is reported before the response is returned
//! - Rejections never touch the network

use std::time::Instant;

use axum::body::Bytes;
use axum::http::{header, HeaderValue, Method, StatusCode};

use crate::backend::BackendRegistry;
use crate::config::GatewayConfig;
use crate::dispatch::{GatewayError, ProxyRequest, ProxyResponse};
use crate::observability::metrics;
use crate::resilience::Permission;
use crate::routing::RouteTable;
use crate::upstream::{CallOutcome, UpstreamCaller, UpstreamRequest};

/// Methods advertised in answers to `OPTIONS`.
const ALLOWED_METHODS: &str = "GET, HEAD, POST, PUT, PATCH, DELETE, OPTIONS";

/// Routes requests to backends through their circuit breakers.
pub struct Dispatcher<C> {
    routes: RouteTable,
    backends: BackendRegistry,
    caller: C,
}

impl<C: UpstreamCaller> Dispatcher<C> {
    pub fn new(routes: RouteTable, backends: BackendRegistry, caller: C) -> Self {
        Self {
            routes,
            backends,
            caller,
        }
    }

    /// Build backends, breakers and routes from configuration.
    pub fn from_config(config: &GatewayConfig, caller: C) -> Result<Self, url::ParseError> {
        let backends = BackendRegistry::from_config(config)?;
        let routes = RouteTable::new(&config.gateway_prefix, &backends);
        Ok(Self::new(routes, backends, caller))
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    /// Handle one client request end to end.
    pub async fn dispatch(&self, request: ProxyRequest) -> ProxyResponse {
        let path = request.path();
        let request_id = request.request_id();

        let Some(route) = self.routes.resolve(path) else {
            tracing::warn!(request_id, path, kind = "no_route", "No route matched");
            return GatewayError::NoRoute.into();
        };
        let backend = route.backend();

        if request.method == Method::OPTIONS {
            let mut response = ProxyResponse::empty(StatusCode::OK);
            response
                .headers
                .insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
            return response;
        }

        let uri = match self
            .routes
            .upstream_path(&request.path_and_query)
            .map(|p| backend.upstream_uri(&p))
        {
            Some(Ok(uri)) => uri,
            _ => {
                tracing::warn!(request_id, backend = backend.id(), path, kind = "invalid_path", "Cannot build upstream URI");
                return GatewayError::InvalidPath.into();
            }
        };

        let permit = match backend.breaker().request_permission() {
            Permission::Allowed(permit) => permit,
            Permission::Rejected => {
                tracing::warn!(
                    request_id,
                    backend = backend.id(),
                    path,
                    kind = GatewayError::BreakerOpen.kind(),
                    "Request rejected by circuit breaker"
                );
                metrics::record_breaker_rejection(backend.id());
                return render(CallOutcome::Rejected);
            }
        };
        let trial = permit.is_trial();

        let body = if request.method == Method::HEAD {
            Bytes::new()
        } else {
            request.body.clone()
        };
        let upstream = UpstreamRequest {
            uri,
            method: request.method.clone(),
            headers: request.forwarded_headers(),
            body,
            timeout: backend.timeout(),
        };

        let started = Instant::now();
        let outcome = self.caller.call(upstream).await;
        permit.report_outcome(&outcome);

        metrics::record_upstream_outcome(backend.id(), outcome.kind(), started);
        if outcome.is_failure() {
            tracing::warn!(
                request_id,
                backend = backend.id(),
                path,
                kind = outcome.kind(),
                trial,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Upstream call failed"
            );
        } else {
            tracing::debug!(request_id, backend = backend.id(), path, kind = outcome.kind(), trial, "Upstream call completed");
        }

        render(outcome)
    }
}

/// Map a call outcome to the response sent to the client.
pub fn render(outcome: CallOutcome) -> ProxyResponse {
    match outcome {
        CallOutcome::Success { status, headers, body }
        | CallOutcome::BackendError { status, headers, body } => {
            ProxyResponse::forwarded(status, headers, body)
        }
        CallOutcome::Timeout => GatewayError::UpstreamTimeout.into(),
        CallOutcome::NetworkError { message } => GatewayError::UpstreamNetwork(message).into(),
        CallOutcome::Rejected => GatewayError::BreakerOpen.into(),
    }
}
