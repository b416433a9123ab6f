//! Retry - Re-run an async operation until it succeeds, fails hard, or times out

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Classification of a failed attempt
#[derive(Debug)]
pub enum RetryError<E> {
    /// Try again after the backoff delay
    Retryable(E),
    /// Give up immediately
    NonRetryable(E),
}

/// Why a retry loop stopped without a result
#[derive(Debug, thiserror::Error)]
pub enum RetryOutcomeError<E> {
    #[error("timeout after {attempts} attempts: {last}")]
    Timeout { last: E, attempts: u32 },

    #[error("{0}")]
    Aborted(E),
}

impl<E> RetryOutcomeError<E> {
    /// The error of the last attempt
    pub fn into_inner(self) -> E {
        match self {
            RetryOutcomeError::Timeout { last, .. } => last,
            RetryOutcomeError::Aborted(e) => e,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RetryOutcomeError::Timeout { .. })
    }
}

/// Delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Constant(Duration),
    /// `first`, then `first + step`, `first + 2*step`, ... capped at `max`
    Incremental {
        first: Duration,
        step: Duration,
        max: Duration,
    },
}

impl Backoff {
    pub fn incremental(first: Duration, step: Duration, max: Duration) -> Self {
        Backoff::Incremental { first, step, max }
    }

    /// Delay after the given 1-based attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Constant(d) => d,
            Backoff::Incremental { first, step, max } => {
                let extra = step.saturating_mul(attempt.saturating_sub(1));
                first.saturating_add(extra).min(max)
            }
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::incremental(
            Duration::from_secs(3),
            Duration::from_secs(5),
            Duration::from_secs(60),
        )
    }
}

/// Run `op` until it returns `Ok`, a non-retryable error, or the timeout
/// would be exceeded by the next wait.
pub async fn retry<T, E, F, Fut>(
    timeout: Duration,
    backoff: Backoff,
    mut op: F,
) -> Result<T, RetryOutcomeError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError<E>>>,
    E: std::fmt::Display,
{
    let deadline = Instant::now() + timeout;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(RetryError::NonRetryable(e)) => return Err(RetryOutcomeError::Aborted(e)),
            Err(RetryError::Retryable(e)) => {
                let delay = backoff.delay(attempt);
                if Instant::now() + delay > deadline {
                    return Err(RetryOutcomeError::Timeout {
                        last: e,
                        attempts: attempt,
                    });
                }
                log::debug!(
                    "attempt {} failed with retryable error, retrying in {:?}: {}",
                    attempt,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
