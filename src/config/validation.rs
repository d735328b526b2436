//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check backend ids and route prefixes are unique
//! - Validate value ranges (timeouts > 0, threshold within 1..=100)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{BreakerConfig, GatewayConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("gateway prefix '{0}' must be empty or start with '/' and not end with '/'")]
    GatewayPrefix(String),

    #[error("no backends configured")]
    NoBackends,

    #[error("backend id '{0}' is empty or duplicated")]
    BackendId(String),

    #[error("backend '{id}': path prefix '{prefix}' must start with '/' and not end with '/'")]
    PathPrefix { id: String, prefix: String },

    #[error("backend '{id}': path prefix '{prefix}' is already routed")]
    DuplicatePrefix { id: String, prefix: String },

    #[error("backend '{id}': base url '{url}' is not an http:// url")]
    BaseUrl { id: String, url: String },

    #[error("{scope}: {reason}")]
    Breaker { scope: String, reason: &'static str },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let prefix = &config.gateway_prefix;
    if !prefix.is_empty() && (!prefix.starts_with('/') || prefix.ends_with('/')) {
        errors.push(ValidationError::GatewayPrefix(prefix.clone()));
    }

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    check_breaker("breaker", &config.breaker, &mut errors);

    let mut ids = HashSet::new();
    let mut prefixes = HashSet::new();
    for backend in &config.backends {
        if backend.id.is_empty() || !ids.insert(backend.id.as_str()) {
            errors.push(ValidationError::BackendId(backend.id.clone()));
        }

        let p = &backend.path_prefix;
        let well_formed = p == "/" || (p.starts_with('/') && !p.ends_with('/'));
        if !well_formed {
            errors.push(ValidationError::PathPrefix {
                id: backend.id.clone(),
                prefix: p.clone(),
            });
        } else if !prefixes.insert(p.as_str()) {
            errors.push(ValidationError::DuplicatePrefix {
                id: backend.id.clone(),
                prefix: p.clone(),
            });
        }

        let http_url = Url::parse(&backend.base_url)
            .map(|u| u.scheme() == "http" && u.host().is_some())
            .unwrap_or(false);
        if !http_url {
            errors.push(ValidationError::BaseUrl {
                id: backend.id.clone(),
                url: backend.base_url.clone(),
            });
        }

        if let Some(breaker) = &backend.breaker {
            check_breaker(&format!("backend '{}' breaker", backend.id), breaker, &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_breaker(scope: &str, breaker: &BreakerConfig, errors: &mut Vec<ValidationError>) {
    let mut fail = |reason| {
        errors.push(ValidationError::Breaker {
            scope: scope.to_string(),
            reason,
        })
    };

    if breaker.timeout_ms == 0 {
        fail("timeout_ms must be greater than zero");
    }
    if breaker.reset_timeout_ms == 0 {
        fail("reset_timeout_ms must be greater than zero");
    }
    if breaker.window_ms == 0 {
        fail("window_ms must be greater than zero");
    }
    if !(1..=100).contains(&breaker.error_threshold_percent) {
        fail("error_threshold_percent must be within 1..=100");
    }
    if breaker.min_samples == 0 {
        fail("min_samples must be at least 1");
    }
}
