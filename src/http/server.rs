//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the health and proxy handlers
//! - Wire up middleware (tracing, body limits, request ID)
//! - Bind server to listener
//! - Hand every proxied request to the dispatcher
//! - Serve the admin endpoints when enabled

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::backend::BackendRegistry;
use crate::config::GatewayConfig;
use crate::dispatch::{Dispatcher, GatewayError};
use crate::health::health_handler;
use crate::http::request::{read_proxy_request, MakeRequestUuid};
use crate::observability::metrics;
use crate::upstream::HyperCaller;

/// Error type for server construction and serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid backend url: {0}")]
    BackendUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher<HyperCaller>>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    backends: BackendRegistry,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        let caller = HyperCaller::new(connect_timeout(&config));
        let dispatcher = Arc::new(Dispatcher::from_config(&config, caller)?);
        let backends = dispatcher.backends().clone();

        let router = Self::build_router(&config, AppState { dispatcher });
        Ok(Self {
            router,
            config,
            backends,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .fallback(proxy_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(DefaultBodyLimit::disable())
                    .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes)),
            )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.backends.all().len(),
            "HTTP server starting"
        );

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            tracing::info!(address = %admin_listener.local_addr()?, "Admin endpoint listening");

            let admin = setup_admin_router(self.backends.clone());
            let mut admin_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                let served = axum::serve(admin_listener, admin)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = served {
                    tracing::error!(error = %e, "Admin server failed");
                }
            });
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Backends and their breakers, shared with the running server.
    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }
}

/// Connect timeout shared by every backend: the longest configured call timeout.
fn connect_timeout(config: &GatewayConfig) -> Duration {
    config
        .backends
        .iter()
        .map(|b| config.breaker_for(b).timeout())
        .max()
        .unwrap_or_else(|| config.breaker.timeout())
}

/// Proxy handler for every path other than `/health`.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    let proxied = match read_proxy_request(request).await {
        Ok(proxied) => proxied,
        Err(err) => {
            metrics::record_request(method.as_str(), err.status().as_u16(), start);
            return err.into_response();
        }
    };

    // Detached so a client disconnect cannot cancel the breaker report.
    let dispatcher = state.dispatcher.clone();
    let response = match tokio::spawn(async move { dispatcher.dispatch(proxied).await }).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Dispatch task failed");
            GatewayError::Internal.into()
        }
    };

    metrics::record_request(method.as_str(), response.status.as_u16(), start);
    response.into_response()
}
