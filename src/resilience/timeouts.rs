//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap backend calls with a hard deadline
//! - Cancel the wrapped operation when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; expiry drops the inner future, which
//!   closes its connection
//! - Timeout errors are distinct from other errors
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The deadline passed before the operation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline of {0:?} elapsed")]
pub struct DeadlineElapsed(pub Duration);

/// Run `operation` with a deadline of `limit`.
pub async fn with_deadline<F>(limit: Duration, operation: F) -> Result<F::Output, DeadlineElapsed>
where
    F: Future,
{
    tokio::time::timeout(limit, operation)
        .await
        .map_err(|_| DeadlineElapsed(limit))
}
