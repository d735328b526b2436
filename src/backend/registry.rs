//! Backend abstraction and registry.
//!
//! # Responsibilities
//! - Represent one configured backend service with its own breaker
//! - Build absolute upstream URIs from rewritten paths
//! - Keep the backends in configuration order for status reporting

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Uri;
use url::Url;

use crate::config::{BackendConfig, GatewayConfig};
use crate::resilience::{BreakerSnapshot, CircuitBreaker};

/// A single backend service.
#[derive(Debug)]
pub struct Backend {
    id: String,
    base_url: Url,
    path_prefix: String,
    breaker: Arc<CircuitBreaker>,
}

impl Backend {
    /// Create a backend and its breaker.
    pub fn new(config: &BackendConfig, breaker: CircuitBreaker) -> Result<Self, url::ParseError> {
        Ok(Self {
            id: config.id.clone(),
            base_url: Url::parse(&config.base_url)?,
            path_prefix: config.path_prefix.clone(),
            breaker: Arc::new(breaker),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Deadline for one call to this backend.
    pub fn timeout(&self) -> Duration {
        self.breaker.config().timeout()
    }

    /// Absolute URI for a path (with query) already stripped of the gateway prefix.
    pub fn upstream_uri(&self, path_and_query: &str) -> Result<Uri, axum::http::uri::InvalidUri> {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{}{}", base, path_and_query).parse()
    }
}

/// All configured backends, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    ordered: Vec<Arc<Backend>>,
    by_id: HashMap<String, Arc<Backend>>,
}

impl BackendRegistry {
    /// Create one backend, and so one breaker, per configured service.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, url::ParseError> {
        let mut registry = Self::default();
        for backend_config in &config.backends {
            let breaker = CircuitBreaker::new(
                backend_config.id.clone(),
                config.breaker_for(backend_config),
            );
            let backend = Arc::new(Backend::new(backend_config, breaker)?);
            tracing::debug!(
                backend = %backend.id,
                base_url = %backend.base_url,
                prefix = %backend.path_prefix,
                "Backend registered"
            );
            registry.by_id.insert(backend.id.clone(), backend.clone());
            registry.ordered.push(backend);
        }
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Backend>> {
        self.by_id.get(id)
    }

    /// Backends in configuration order.
    pub fn all(&self) -> &[Arc<Backend>] {
        &self.ordered
    }

    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        self.ordered.iter().map(|b| b.breaker.snapshot()).collect()
    }
}
