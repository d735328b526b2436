//! Gateway liveness endpoint.
//!
//! `GET /health` is answered locally: it never consults a breaker or
//! contacts a backend, so it stays green while backends are failing.

use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self {
            status: "OK".to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

pub async fn health_handler() -> Json<HealthStatus> {
    Json(HealthStatus::ok())
}
