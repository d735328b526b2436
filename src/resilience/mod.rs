//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → circuit_breaker.rs (permission: allowed, trial, or rejected)
//!     → timeouts.rs (enforce the per-backend call deadline)
//!     → circuit_breaker.rs (outcome reported, state updated)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries: a failed call is reported once and surfaced to the client
//! - Circuit breaker prevents cascading failures and unbounded latency

pub mod circuit_breaker;
pub mod timeouts;

pub use circuit_breaker::{BreakerSnapshot, BreakerState, CallPermit, CircuitBreaker, Permission};
pub use timeouts::{with_deadline, DeadlineElapsed};
