//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Path prefix owned by the gateway and stripped before forwarding.
    pub gateway_prefix: String,

    /// Backend service definitions, one breaker each.
    pub backends: Vec<BackendConfig>,

    /// Default breaker settings, overridable per backend.
    pub breaker: BreakerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin endpoint settings.
    pub admin: AdminConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            gateway_prefix: "/api".to_string(),
            backends: vec![
                BackendConfig {
                    id: "users".to_string(),
                    base_url: "http://localhost:3001".to_string(),
                    path_prefix: "/users".to_string(),
                    url_env: Some("USER_SERVICE_URL".to_string()),
                    breaker: None,
                },
                BackendConfig {
                    id: "products".to_string(),
                    base_url: "http://localhost:3002".to_string(),
                    path_prefix: "/products".to_string(),
                    url_env: Some("PRODUCT_SERVICE_URL".to_string()),
                    breaker: None,
                },
            ],
            breaker: BreakerConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Breaker settings that apply to `backend`.
    pub fn breaker_for(&self, backend: &BackendConfig) -> BreakerConfig {
        backend.breaker.clone().unwrap_or_else(|| self.breaker.clone())
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Largest request body accepted for forwarding, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Backend service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Unique backend identifier, used in logs and metrics.
    pub id: String,

    /// Base URL requests are forwarded to (e.g., "http://127.0.0.1:3001").
    pub base_url: String,

    /// Path prefix under the gateway prefix that routes to this backend.
    pub path_prefix: String,

    /// Environment variable that overrides `base_url` when set.
    #[serde(default)]
    pub url_env: Option<String>,

    /// Breaker settings for this backend only.
    #[serde(default)]
    pub breaker: Option<BreakerConfig>,
}

/// Circuit breaker settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Upstream call timeout in milliseconds.
    pub timeout_ms: u64,

    /// Failure percentage (1-100) in the window that opens the breaker.
    pub error_threshold_percent: u8,

    /// Time the breaker stays open before allowing a trial call.
    pub reset_timeout_ms: u64,

    /// Calls required in the window before the failure rate is evaluated.
    pub min_samples: u32,

    /// Length of the counting window in milliseconds.
    pub window_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            error_threshold_percent: 50,
            reset_timeout_ms: 10_000,
            min_samples: 4,
            window_ms: 10_000,
        }
    }
}

impl BreakerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve breaker status on a separate listener.
    pub enabled: bool,

    /// Admin listener bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
