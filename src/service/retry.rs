//! Bounded retry with exponential backoff for idempotent reads.
//!
//! A [`RetryState`] lives for one operation inside one tick and is dropped
//! with it; nothing carries backoff memory across ticks.

use std::future::Future;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::sleep_until;
use tracing::{debug, warn};

use crate::app::RetryConfig;
use crate::error::{LedgerError, ReadError, WatchError};

/// Errors that may succeed when the same call is repeated.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for LedgerError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transport(_))
    }
}

impl Transient for ReadError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Ledger(err) if err.is_transient())
    }
}

impl Transient for WatchError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Ledger(err) if err.is_transient())
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            multiplier: config.backoff_multiplier.max(1.0),
        }
    }

    /// Single attempt, no backoff.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, E, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + std::fmt::Display,
    {
        let mut state = RetryState::new(self);
        loop {
            sleep_until(state.next_allowed.into()).await;
            state.attempts += 1;

            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && state.attempts < self.max_attempts => {
                    let delay = state.advance(self);
                    warn!(
                        operation,
                        attempt = state.attempts,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient failure, retrying"
                    );
                }
                Err(err) => {
                    debug!(operation, attempts = state.attempts, "Giving up");
                    return Err(err);
                }
            }
        }
    }
}

/// Attempt count and earliest next attempt for one operation.
#[derive(Debug)]
pub struct RetryState {
    attempts: u32,
    next_allowed: Instant,
    delay: Duration,
}

impl RetryState {
    fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempts: 0,
            next_allowed: Instant::now(),
            delay: policy.initial_backoff,
        }
    }

    /// Schedule the next attempt and grow the delay. Returns the wait.
    fn advance(&mut self, policy: &RetryPolicy) -> Duration {
        let base = self.delay;
        let wait = base + jitter(base);
        self.next_allowed = Instant::now() + wait;

        // Float-to-int `as` saturates, so a huge multiplier lands on the cap.
        let grown_ms = (base.as_millis() as f64 * policy.multiplier) as u64;
        self.delay = Duration::from_millis(grown_ms).min(policy.max_backoff);
        wait
    }

    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Up to 20% random jitter on top of the base delay.
fn jitter(base: Duration) -> Duration {
    let range_ms = (base.as_millis() as u64) / 5;
    if range_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=range_ms))
}
