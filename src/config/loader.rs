//! Configuration loading from disk and environment.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that replaces the listener port.
pub const PORT_ENV: &str = "PORT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {var}='{value}'")]
    Env { var: String, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };
    finish(config, |var| std::env::var(var).ok())
}

/// Apply overrides from `lookup` and validate.
pub fn finish(
    mut config: GatewayConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<GatewayConfig, ConfigError> {
    apply_env_overrides(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn apply_env_overrides(
    config: &mut GatewayConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(port) = lookup(PORT_ENV) {
        let parsed = port.parse::<u16>().ok();
        let addr = config.listener.bind_address.parse::<SocketAddr>().ok();
        match (parsed, addr) {
            (Some(port), Some(mut addr)) => {
                addr.set_port(port);
                config.listener.bind_address = addr.to_string();
            }
            _ => {
                return Err(ConfigError::Env {
                    var: PORT_ENV.to_string(),
                    value: port,
                })
            }
        }
    }

    for backend in &mut config.backends {
        let Some(var) = backend.url_env.as_deref() else {
            continue;
        };
        if let Some(url) = lookup(var).filter(|u| !u.is_empty()) {
            tracing::debug!(backend = %backend.id, var, url = %url, "Base URL overridden from environment");
            backend.base_url = url;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn environment_overrides_port_and_urls() {
        let config = finish(
            GatewayConfig::default(),
            env(&[
                ("PORT", "8088"),
                ("USER_SERVICE_URL", "http://users:4001"),
            ]),
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:8088");
        assert_eq!(config.backends[0].base_url, "http://users:4001");
        assert_eq!(config.backends[1].base_url, "http://localhost:3002");
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = finish(GatewayConfig::default(), env(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { ref var, .. } if var == "PORT"));
    }

    #[test]
    fn overridden_url_is_validated() {
        let err = finish(
            GatewayConfig::default(),
            env(&[("PRODUCT_SERVICE_URL", "products:3002")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Some(Path::new("/nonexistent/gateway.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
