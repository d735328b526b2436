//! Upstream call subsystem.
//!
//! # Data Flow
//! ```text
//! UpstreamRequest (absolute URI, method, headers, body, deadline)
//!     → caller.rs (hyper client, deadline enforced)
//!     → outcome.rs (Success / BackendError / Timeout / NetworkError)
//!     → back to the dispatcher, which reports to the breaker
//! ```

pub mod caller;
pub mod outcome;

pub use caller::{HyperCaller, UpstreamCaller, UpstreamRequest};
pub use outcome::CallOutcome;
