//! Backend subsystem.
//!
//! # Data Flow
//! ```text
//! BackendConfig[] (validated)
//!     → registry.rs (one Backend + one CircuitBreaker per entry)
//!     → shared via Arc with the route table and admin endpoints
//! ```
//!
//! # Design Decisions
//! - Exactly one breaker per backend; breakers are never shared
//! - Backends are immutable after startup

pub mod registry;

pub use registry::{Backend, BackendRegistry};
