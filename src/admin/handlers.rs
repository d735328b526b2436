use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::backend::BackendRegistry;
use crate::resilience::BreakerSnapshot;

#[derive(Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub backends: usize,
    pub open_breakers: usize,
}

#[derive(Serialize)]
pub struct BackendStatus {
    pub id: String,
    pub base_url: String,
    pub path_prefix: String,
    pub breaker: BreakerSnapshot,
}

pub async fn get_status(State(backends): State<BackendRegistry>) -> Json<SystemStatus> {
    let snapshots = backends.snapshots();
    let open_breakers = snapshots
        .iter()
        .filter(|s| s.state != crate::resilience::BreakerState::Closed)
        .count();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: if open_breakers == 0 { "operational" } else { "degraded" }.to_string(),
        backends: snapshots.len(),
        open_breakers,
    })
}

pub async fn get_breakers(State(backends): State<BackendRegistry>) -> Json<Vec<BackendStatus>> {
    let statuses = backends
        .all()
        .iter()
        .map(|b| BackendStatus {
            id: b.id().to_string(),
            base_url: b.base_url().to_string(),
            path_prefix: b.path_prefix().to_string(),
            breaker: b.breaker().snapshot(),
        })
        .collect();

    Json(statuses)
}
