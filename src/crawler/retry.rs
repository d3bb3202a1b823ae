//! Bounded retry with exponential backoff
//!
//! One policy object drives every retried operation in the crate: page
//! fetches and index writes. It is parametrized by the attempt bound, the
//! base delay, and a predicate deciding which errors are worth retrying.

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Largest shift applied to the base delay
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Retry/backoff policy for operations failing with `E`
pub struct RetryPolicy<E> {
    max_attempts: u32,
    base_delay: Duration,
    retryable: fn(&E) -> bool,
}

/// The last error of an operation that never succeeded
#[derive(Debug)]
pub struct RetryError<E> {
    /// Attempts made, including the first one
    pub attempts: u32,

    pub error: E,
}

impl<E> RetryPolicy<E> {
    /// Creates a policy
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Total attempts including the first (clamped to >= 1)
    /// * `base_delay` - Sleep after the first failure; doubles after each one
    /// * `retryable` - Returns true for errors that may succeed on retry
    pub fn new(max_attempts: u32, base_delay: Duration, retryable: fn(&E) -> bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            retryable,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff slept after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.base_delay.saturating_mul(1u32 << shift)
    }

    pub fn is_retryable(&self, error: &E) -> bool {
        (self.retryable)(error)
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if attempt >= self.max_attempts || !self.is_retryable(&error) {
                        return Err(RetryError {
                            attempts: attempt,
                            error,
                        });
                    }

                    let delay = self.delay_for(attempt);
                    tracing::debug!(
                        "Attempt {}/{} failed, backing off {:?}",
                        attempt,
                        self.max_attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            retryable: self.retryable,
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .finish()
    }
}
