//! Read-only admin endpoints, served on their own listener.

pub mod handlers;

use axum::{routing::get, Router};

use self::handlers::*;
use crate::backend::BackendRegistry;

pub fn setup_admin_router(backends: BackendRegistry) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/breakers", get(get_breakers))
        .with_state(backends)
}
