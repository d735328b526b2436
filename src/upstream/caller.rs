//! Upstream HTTP calls.
//!
//! # Responsibilities
//! - Execute exactly one request against a backend
//! - Enforce the per-backend deadline over headers and body
//! - Classify the result into a [`CallOutcome`]
//!
//! # Design Decisions
//! - The caller never touches breaker state; the dispatcher reports outcomes
//! - Response bodies are buffered so a slow body is covered by the deadline
//! - On timeout the request future is dropped, closing its connection

use std::future::Future;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::resilience::timeouts::with_deadline;
use crate::upstream::CallOutcome;

/// One request to send to a backend.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub uri: Uri,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub timeout: Duration,
}

/// Executes upstream requests and classifies their results.
pub trait UpstreamCaller: Send + Sync + 'static {
    fn call(&self, request: UpstreamRequest) -> impl Future<Output = CallOutcome> + Send;
}

/// [`UpstreamCaller`] backed by a pooled hyper client.
#[derive(Clone)]
pub struct HyperCaller {
    client: Client<HttpConnector, Body>,
    max_response_bytes: usize,
}

impl HyperCaller {
    /// Largest response body buffered by default.
    pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

    pub fn new(connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            client,
            max_response_bytes: Self::DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = limit;
        self
    }

    async fn exchange(&self, request: Request<Body>) -> Result<CallOutcome, String> {
        let response: hyper::Response<hyper::body::Incoming> = self
            .client
            .request(request)
            .await
            .map_err(|e| describe(&e))?;

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), self.max_response_bytes)
            .await
            .map_err(|e| describe(&e))?;

        Ok(CallOutcome::from_response(parts.status, parts.headers, body))
    }
}

impl UpstreamCaller for HyperCaller {
    async fn call(&self, request: UpstreamRequest) -> CallOutcome {
        let UpstreamRequest {
            uri,
            method,
            headers,
            body,
            timeout,
        } = request;

        let mut outbound = match Request::builder().method(method).uri(uri).body(Body::from(body)) {
            Ok(req) => req,
            Err(e) => {
                return CallOutcome::NetworkError {
                    message: format!("invalid upstream request: {}", e),
                }
            }
        };
        *outbound.headers_mut() = headers;

        match with_deadline(timeout, self.exchange(outbound)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(message)) => CallOutcome::NetworkError { message },
            Err(_) => CallOutcome::Timeout,
        }
    }
}

/// Flatten an error and its sources into one line.
fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "client error (Connect)")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn describe_walks_source_chain() {
        let err = Outer(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert_eq!(describe(&err), "client error (Connect): connection refused");
    }
}
