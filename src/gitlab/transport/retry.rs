//! Retry budget and backoff arithmetic.

use std::time::Duration;

use http::HeaderMap;
use http::header::RETRY_AFTER;
use rand::Rng;

/// Retries performed after the first attempt unless configured otherwise.
pub const DEFAULT_RETRIES: u32 = 3;
/// Base delay for exponential backoff, in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
/// Wait applied to a 429 response that carries no `Retry-After` header.
pub const DEFAULT_RETRY_AFTER_SECONDS: u64 = 60;

const BACKOFF_JITTER_MS: u64 = 500;
const RATE_LIMIT_JITTER_MS: u64 = 1_000;
const MIN_RETRY_AFTER_SECONDS: u64 = 1;

/// Retry budget and delay policy for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    retries: u32,
    base_delay: Duration,
    jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRIES, Duration::from_millis(DEFAULT_BASE_DELAY_MS))
    }
}

impl RetryPolicy {
    /// Creates a policy allowing `retries` retries after the first attempt.
    #[must_use]
    pub const fn new(retries: u32, base_delay: Duration) -> Self {
        Self {
            retries,
            base_delay,
            jitter: true,
        }
    }

    /// Enables or disables the random jitter component.
    ///
    /// Jitter is on by default; turning it off makes delays exact.
    #[must_use]
    pub const fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Number of retries after the first attempt.
    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.retries
    }

    /// Total attempts including the first one.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Base delay used for exponential backoff.
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Exponential component of the delay before retrying after `attempt`
    /// (zero-based): `base * 2^attempt`, saturating on overflow.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Delay before the next attempt after a network failure or a generic
    /// non-success status: exponential backoff plus up to 500ms of jitter.
    #[must_use]
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.backoff_delay(attempt)
            .saturating_add(self.jitter_up_to(BACKOFF_JITTER_MS))
    }

    /// Delay before retrying a 429 response: the requested wait (at least one
    /// second) plus up to one second of jitter.
    #[must_use]
    pub fn rate_limit_delay(&self, retry_after_seconds: u64) -> Duration {
        Duration::from_secs(retry_after_seconds.max(MIN_RETRY_AFTER_SECONDS))
            .saturating_add(self.jitter_up_to(RATE_LIMIT_JITTER_MS))
    }

    fn jitter_up_to(&self, max_ms: u64) -> Duration {
        if !self.jitter {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }
}

/// Reads `Retry-After` as whole seconds, defaulting to 60 when the header is
/// absent or not a plain integer.
#[must_use]
pub fn retry_after_seconds(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECONDS)
}
