//! Response handling and transformation.
//!
//! # Responsibilities
//! - Turn a [`ProxyResponse`] into the transport response
//!
//! # Design Decisions
//! - Status, headers and body are copied as-is; the dispatcher has already
//!   removed hop-by-hop headers and mapped failures to 502/503/504

use axum::body::Body;
use axum::response::{IntoResponse, Response};

use crate::dispatch::{GatewayError, ProxyResponse};

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        ProxyResponse::from(self).into_response()
    }
}
