//! Bounded retry with doubling backoff

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::RetryError;

/// Default number of attempts before giving up.
pub const DEFAULT_ATTEMPTS: u32 = 5;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(5);

/// Delay to wait before retry round `rounds`.
///
/// Rounds below 2 wait `base`; every later round doubles the previous
/// delay. Saturates at [`Duration::MAX`].
pub fn doubling_backoff(base: Duration, rounds: u32) -> Duration {
    if rounds < 2 {
        return base;
    }
    1u32.checked_shl(rounds.saturating_sub(1))
        .and_then(|factor| base.checked_mul(factor))
        .unwrap_or(Duration::MAX)
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the delay, then try again
    Retry(Duration),
    /// Stop; the attempt budget is spent
    Exhausted,
}

/// How many times to try an action and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts,
            base_delay,
        }
    }

    /// Decide what follows the failure of zero-based attempt `attempt`.
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        let made = attempt.saturating_add(1);
        if made >= self.attempts {
            RetryDecision::Exhausted
        } else {
            RetryDecision::Retry(doubling_backoff(self.base_delay, made))
        }
    }

    /// Run `work` until it succeeds or the attempt budget is spent.
    ///
    /// `work` is always invoked at least once. Each failure is logged with
    /// `action` before sleeping.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::Exhausted`] carrying the last error when every
    /// attempt fails.
    pub async fn run<T, E, F, Fut>(&self, action: &str, mut work: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0u32;
        loop {
            let err = match work().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let made = attempt.saturating_add(1);
            warn!("{action} failed (attempt {made}/{}): {err}", self.attempts.max(1));
            match self.decide(attempt) {
                RetryDecision::Exhausted => {
                    return Err(RetryError::Exhausted {
                        action: action.to_string(),
                        attempts: made,
                        last: err,
                    });
                }
                RetryDecision::Retry(delay) => {
                    info!("Retrying {action} in {delay:?}");
                    tokio::time::sleep(delay).await;
                }
            }
            attempt = made;
        }
    }
}
