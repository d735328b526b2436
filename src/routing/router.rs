//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the backend for a request path
//! - Rewrite the path for forwarding
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) prefix scan over routes sorted longest-first
//! - Explicit no-match rather than silent default

use std::sync::Arc;

use crate::backend::{Backend, BackendRegistry};
use crate::routing::matcher::PathPrefixMatcher;

/// A compiled route: full path prefix to backend.
#[derive(Debug, Clone)]
pub struct Route {
    matcher: PathPrefixMatcher,
    backend: Arc<Backend>,
}

impl Route {
    pub fn backend(&self) -> &Arc<Backend> {
        &self.backend
    }

    pub fn prefix(&self) -> &str {
        self.matcher.prefix()
    }
}

/// Static mapping from path prefix to backend.
#[derive(Debug, Clone)]
pub struct RouteTable {
    gateway: PathPrefixMatcher,
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile routes as `<gateway_prefix><backend path_prefix>`.
    pub fn new(gateway_prefix: &str, backends: &BackendRegistry) -> Self {
        let gateway = PathPrefixMatcher::new(gateway_prefix);

        let mut routes: Vec<Route> = backends
            .all()
            .iter()
            .map(|backend| {
                let full = format!("{}{}", gateway.prefix().trim_end_matches('/'), backend.path_prefix());
                Route {
                    matcher: PathPrefixMatcher::new(full),
                    backend: backend.clone(),
                }
            })
            .collect();
        // Longest prefix first; ties cannot occur after validation.
        routes.sort_by(|a, b| b.matcher.len().cmp(&a.matcher.len()));

        for route in &routes {
            tracing::debug!(prefix = %route.prefix(), backend = %route.backend.id(), "Route compiled");
        }

        Self { gateway, routes }
    }

    /// Find the route with the longest prefix matching `path` (no query).
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matcher.matches(path))
    }

    /// Strip the gateway prefix, keeping the rest of the path and the query.
    pub fn upstream_path(&self, path_and_query: &str) -> Option<String> {
        self.gateway.strip(path_and_query)
    }
}
