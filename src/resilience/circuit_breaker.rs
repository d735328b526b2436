//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backend assumed down, requests fail fast
//! - Half-Open: testing if backend recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure rate >= threshold, with at least min_samples in the window
//! Open → Half-Open: first permission request after reset_timeout
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails
//! ```
//!
//! # Design Decisions
//! - Per-backend circuit breaker (not global)
//! - Fail fast in Open state (no waiting for timeout)
//! - Single trial in Half-Open, claimed with a compare-and-set
//! - The state lock is never held across the upstream call

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::upstream::CallOutcome;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }
}

/// Answer to a permission request.
#[derive(Debug)]
pub enum Permission {
    /// The call may proceed; its outcome must be reported through the permit.
    Allowed(CallPermit),
    /// The breaker is open, or a trial call is already in flight.
    Rejected,
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub backend: String,
    pub state: BreakerState,
    pub failures: u32,
    pub total: u32,
    pub trial_in_flight: bool,
}

/// Fixed time window of call results.
#[derive(Debug)]
struct Window {
    start: Instant,
    failures: u32,
    total: u32,
}

impl Window {
    fn new(now: Instant) -> Self {
        Self {
            start: now,
            failures: 0,
            total: 0,
        }
    }

    fn record(&mut self, now: Instant, failed: bool, config: &BreakerConfig) {
        if now.duration_since(self.start) >= config.window() {
            *self = Window::new(now);
        }
        self.total += 1;
        if failed {
            self.failures += 1;
        }
    }

    fn tripped(&self, config: &BreakerConfig) -> bool {
        self.total >= config.min_samples
            && u64::from(self.failures) * 100
                >= u64::from(config.error_threshold_percent) * u64::from(self.total)
    }
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    window: Window,
    opened_at: Option<Instant>,
    /// Bumped on every trip; permits from an earlier Closed period are stale.
    generation: u64,
}

/// Circuit breaker guarding one backend.
#[derive(Debug)]
pub struct CircuitBreaker {
    backend: String,
    config: BreakerConfig,
    inner: Mutex<Inner>,
    trial_in_flight: AtomicBool,
}

impl CircuitBreaker {
    /// Create a closed breaker for `backend`.
    pub fn new(backend: impl Into<String>, config: BreakerConfig) -> Self {
        let backend = backend.into();
        metrics::record_breaker_state(&backend, BreakerState::Closed);
        Self {
            backend,
            config,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                window: Window::new(Instant::now()),
                opened_at: None,
                generation: 0,
            }),
            trial_in_flight: AtomicBool::new(false),
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    /// Ask whether a call to the backend may proceed.
    pub fn request_permission(self: &Arc<Self>) -> Permission {
        let now = Instant::now();
        let mut inner = self.lock();

        let trial = match inner.state {
            BreakerState::Closed => false,
            BreakerState::Open => {
                let cooled = inner
                    .opened_at
                    .map(|at| now.duration_since(at) >= self.config.reset_timeout())
                    .unwrap_or(true);
                if !cooled {
                    return Permission::Rejected;
                }
                self.transition(&mut inner, BreakerState::HalfOpen);
                true
            }
            BreakerState::HalfOpen => true,
        };

        if trial
            && self
                .trial_in_flight
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            return Permission::Rejected;
        }

        Permission::Allowed(CallPermit {
            breaker: Arc::clone(self),
            generation: inner.generation,
            trial,
            settled: false,
        })
    }

    /// Snapshot for status endpoints.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            backend: self.backend.clone(),
            state: inner.state,
            failures: inner.window.failures,
            total: inner.window.total,
            trial_in_flight: self.trial_in_flight.load(Ordering::Acquire),
        }
    }

    fn settle(&self, generation: u64, trial: bool, failed: bool) {
        let now = Instant::now();
        let mut inner = self.lock();

        if trial {
            if inner.state == BreakerState::HalfOpen {
                if failed {
                    inner.opened_at = Some(now);
                    self.transition(&mut inner, BreakerState::Open);
                } else {
                    inner.window = Window::new(now);
                    inner.opened_at = None;
                    self.transition(&mut inner, BreakerState::Closed);
                }
            }
            self.trial_in_flight.store(false, Ordering::Release);
            return;
        }

        // Late result of a call admitted before the breaker tripped.
        if inner.state != BreakerState::Closed || inner.generation != generation {
            return;
        }

        inner.window.record(now, failed, &self.config);
        if inner.window.tripped(&self.config) {
            tracing::warn!(
                backend = %self.backend,
                failures = inner.window.failures,
                total = inner.window.total,
                threshold_percent = self.config.error_threshold_percent,
                "Failure threshold reached"
            );
            inner.opened_at = Some(now);
            inner.generation += 1;
            self.transition(&mut inner, BreakerState::Open);
        }
    }

    fn transition(&self, inner: &mut Inner, to: BreakerState) {
        let from = inner.state;
        inner.state = to;
        tracing::info!(
            backend = %self.backend,
            from = from.as_str(),
            to = to.as_str(),
            "Circuit breaker state change"
        );
        metrics::record_breaker_state(&self.backend, to);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State updates are single assignments; a poisoned lock still holds
        // a consistent record.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Permission to make one upstream call.
///
/// Reporting consumes the permit, so an outcome is recorded at most once per
/// permitted call. A permit dropped without a report counts as a failure.
#[derive(Debug)]
pub struct CallPermit {
    breaker: Arc<CircuitBreaker>,
    generation: u64,
    trial: bool,
    settled: bool,
}

impl CallPermit {
    /// Whether this call is the half-open trial.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    /// Record the outcome of the permitted call.
    pub fn report_outcome(mut self, outcome: &CallOutcome) {
        self.settled = true;
        self.breaker
            .settle(self.generation, self.trial, outcome.is_failure());
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(
                backend = %self.breaker.backend,
                trial = self.trial,
                "Call abandoned without an outcome, recording failure"
            );
            self.breaker.settle(self.generation, self.trial, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, StatusCode};
    use std::time::Duration;

    fn config() -> BreakerConfig {
        BreakerConfig {
            timeout_ms: 5_000,
            error_threshold_percent: 50,
            reset_timeout_ms: 10_000,
            min_samples: 4,
            window_ms: 60_000,
        }
    }

    fn response(status: u16) -> CallOutcome {
        CallOutcome::from_response(
            StatusCode::from_u16(status).unwrap(),
            HeaderMap::new(),
            Bytes::new(),
        )
    }

    fn permit(breaker: &Arc<CircuitBreaker>) -> CallPermit {
        match breaker.request_permission() {
            Permission::Allowed(p) => p,
            Permission::Rejected => panic!("expected permission, breaker is {:?}", breaker.state()),
        }
    }

    fn call(breaker: &Arc<CircuitBreaker>, outcome: CallOutcome) {
        permit(breaker).report_outcome(&outcome);
    }

    fn trip(breaker: &Arc<CircuitBreaker>) {
        for _ in 0..4 {
            call(breaker, response(500));
        }
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn opens_on_fourth_report_at_threshold() {
        let breaker = Arc::new(CircuitBreaker::new("users", config()));

        for status in [500, 500, 200] {
            call(&breaker, response(status));
            assert_eq!(breaker.state(), BreakerState::Closed);
        }
        call(&breaker, response(200));

        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(matches!(breaker.request_permission(), Permission::Rejected));
    }

    #[tokio::test(start_paused = true)]
    async fn min_samples_prevents_early_trip() {
        let breaker = Arc::new(CircuitBreaker::new("users", config()));

        for _ in 0..3 {
            call(&breaker, CallOutcome::Timeout);
        }
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert_eq!(breaker.snapshot().failures, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_never_trips() {
        let breaker = Arc::new(CircuitBreaker::new("users", config()));

        for _ in 0..20 {
            call(&breaker, response(404));
        }
        let snap = breaker.snapshot();
        assert_eq!(snap.state, BreakerState::Closed);
        assert_eq!(snap.failures, 0);
        assert_eq!(snap.total, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn window_expiry_resets_counts() {
        let breaker = Arc::new(CircuitBreaker::new("users", config()));

        for _ in 0..3 {
            call(&breaker, response(502));
        }
        tokio::time::advance(Duration::from_secs(61)).await;
        call(&breaker, response(502));

        let snap = breaker.snapshot();
        assert_eq!(snap.state, BreakerState::Closed);
        assert_eq!(snap.total, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stays_open_until_reset_timeout() {
        let breaker = Arc::new(CircuitBreaker::new("users", config()));
        trip(&breaker);

        tokio::time::advance(Duration::from_millis(9_999)).await;
        assert!(matches!(breaker.request_permission(), Permission::Rejected));
        assert_eq!(breaker.state(), BreakerState::Open);

        tokio::time::advance(Duration::from_millis(1)).await;
        let trial = permit(&breaker);
        assert!(trial.is_trial());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_admits_single_trial() {
        let breaker = Arc::new(CircuitBreaker::new("users", config()));
        trip(&breaker);
        tokio::time::advance(Duration::from_secs(10)).await;

        let trial = permit(&breaker);
        for _ in 0..10 {
            assert!(matches!(breaker.request_permission(), Permission::Rejected));
        }
        assert!(breaker.snapshot().trial_in_flight);

        trial.report_outcome(&response(200));
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert!(!breaker.snapshot().trial_in_flight);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_get_one_trial() {
        let breaker = Arc::new(CircuitBreaker::new("users", config()));
        trip(&breaker);
        tokio::time::advance(Duration::from_secs(10)).await;

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let breaker = breaker.clone();
                let runtime = tokio::runtime::Handle::current();
                std::thread::spawn(move || {
                    // Share the paused clock with the test runtime.
                    let _clock = runtime.enter();
                    match breaker.request_permission() {
                        Permission::Allowed(p) => Some(p),
                        Permission::Rejected => None,
                    }
                })
            })
            .collect();
        let permits: Vec<CallPermit> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(permits.len(), 1);
        assert!(permits[0].is_trial());
    }

    #[tokio::test(start_paused = true)]
    async fn successful_trial_closes_and_resets_window() {
        let breaker = Arc::new(CircuitBreaker::new("users", config()));
        trip(&breaker);
        tokio::time::advance(Duration::from_secs(10)).await;

        permit(&breaker).report_outcome(&response(204));

        let snap = breaker.snapshot();
        assert_eq!(snap.state, BreakerState::Closed);
        assert_eq!((snap.failures, snap.total), (0, 0));

        // A fresh window needs min_samples again before tripping.
        for _ in 0..3 {
            call(&breaker, response(500));
        }
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_trial_reopens_and_restarts_cooldown() {
        let breaker = Arc::new(CircuitBreaker::new("users", config()));
        trip(&breaker);
        tokio::time::advance(Duration::from_secs(10)).await;

        permit(&breaker).report_outcome(&CallOutcome::Timeout);
        assert_eq!(breaker.state(), BreakerState::Open);

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(matches!(breaker.request_permission(), Permission::Rejected));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(permit(&breaker).is_trial());
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_trial_counts_as_success() {
        let breaker = Arc::new(CircuitBreaker::new("users", config()));
        trip(&breaker);
        tokio::time::advance(Duration::from_secs(10)).await;

        permit(&breaker).report_outcome(&response(404));
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_trial_permit_reopens() {
        let breaker = Arc::new(CircuitBreaker::new("users", config()));
        trip(&breaker);
        tokio::time::advance(Duration::from_secs(10)).await;

        drop(permit(&breaker));

        let snap = breaker.snapshot();
        assert_eq!(snap.state, BreakerState::Open);
        assert!(!snap.trial_in_flight);
    }

    #[tokio::test(start_paused = true)]
    async fn late_results_after_trip_are_ignored() {
        let breaker = Arc::new(CircuitBreaker::new("users", config()));
        let slow = permit(&breaker);
        trip(&breaker);

        slow.report_outcome(&response(200));
        let snap = breaker.snapshot();
        assert_eq!(snap.state, BreakerState::Open);
        assert_eq!(snap.total, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_results_do_not_count_after_recovery() {
        let breaker = Arc::new(CircuitBreaker::new("users", config()));
        let stale: Vec<CallPermit> = (0..4).map(|_| permit(&breaker)).collect();
        for _ in 0..4 {
            call(&breaker, CallOutcome::Timeout);
        }
        assert_eq!(breaker.state(), BreakerState::Open);

        tokio::time::advance(Duration::from_secs(10)).await;
        permit(&breaker).report_outcome(&response(200));
        assert_eq!(breaker.state(), BreakerState::Closed);

        for p in stale {
            p.report_outcome(&CallOutcome::Timeout);
        }
        let snap = breaker.snapshot();
        assert_eq!(snap.state, BreakerState::Closed);
        assert_eq!((snap.failures, snap.total), (0, 0));

        // Permits from the new Closed period still count.
        for _ in 0..4 {
            call(&breaker, CallOutcome::Timeout);
        }
        assert_eq!(breaker.state(), BreakerState::Open);
    }
}
