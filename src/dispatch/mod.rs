//! Dispatch subsystem: the breaker-guarded proxy core.
//!
//! # Data Flow
//! ```text
//! ProxyRequest
//!     → routing (longest prefix → Backend, or 404 no route)
//!     → gateway prefix stripped
//!     → Backend breaker: Rejected → 503 immediately
//!     → upstream caller (deadline enforced)
//!     → outcome reported to the breaker
//!     → ProxyResponse (passthrough, 502, 503 or 504)
//! ```

pub mod dispatcher;
pub mod error;
pub mod message;

pub use dispatcher::{render, Dispatcher};
pub use error::GatewayError;
pub use message::{ProxyRequest, ProxyResponse};
