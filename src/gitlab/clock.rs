//! Time source used for retry backoff and cache expiry.
//!
//! Production code uses [`TokioClock`]. Tests substitute [`ManualClock`],
//! which never really sleeps: it records each requested delay and advances
//! its own notion of "now" by that amount.

use std::sync::Arc;
#[cfg(any(test, feature = "test-support"))]
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

/// Sleep and current-time primitives.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;

    /// Suspends the calling task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the Tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns the shared production clock.
#[must_use]
pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(TokioClock)
}

/// Virtual clock for deterministic tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualClockState>,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
struct ManualClockState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl ManualClock {
    /// Creates a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualClockState::default()),
        }
    }

    /// Moves the clock forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut state) = self.state.lock() {
            state.elapsed = state.elapsed.saturating_add(duration);
        }
    }

    /// Returns every delay requested through [`Clock::sleep`], in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state
            .lock()
            .map(|state| state.sleeps.clone())
            .unwrap_or_default()
    }

    /// Total virtual time elapsed since construction.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.state
            .lock()
            .map(|state| state.elapsed)
            .unwrap_or_default()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        if let Ok(mut state) = self.state.lock() {
            state.sleeps.push(duration);
            state.elapsed = state.elapsed.saturating_add(duration);
        }
        tokio::task::yield_now().await;
    }
}
