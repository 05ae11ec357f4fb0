//! Bounded fixed-interval retry.
//!
//! A `RetryPolicy` re-invokes an async operation until it succeeds, fails with
//! an error the policy does not classify as retryable, or the time budget runs
//! out. The delay between attempts is always exactly `interval`.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::trial::error::{Error, Result};

/// Predicate deciding whether a failure is worth another attempt.
pub type RetryPredicate = fn(&Error) -> bool;

/// Fixed-interval retry with an optional total time budget.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total time budget. `None` retries until success or a fatal error.
    pub max_wait: Option<Duration>,
    /// Delay between two attempts.
    pub interval: Duration,
    /// Classifies failures as transient.
    pub retryable_on: RetryPredicate,
}

impl RetryPolicy {
    /// Bounded policy retrying every error for which `Error::is_retryable` holds.
    pub const fn new(max_wait: Duration, interval: Duration) -> Self {
        Self {
            max_wait: Some(max_wait),
            interval,
            retryable_on: Error::is_retryable,
        }
    }

    /// Policy without an overall deadline.
    pub const fn unbounded(interval: Duration) -> Self {
        Self {
            max_wait: None,
            interval,
            retryable_on: Error::is_retryable,
        }
    }

    /// Replace the transient-failure predicate.
    pub const fn retry_on(mut self, predicate: RetryPredicate) -> Self {
        self.retryable_on = predicate;
        self
    }

    /// Run `op` under this policy.
    ///
    /// `operation` names the call in logs and in `Error::RetryExhausted`.
    pub async fn execute<T, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !(self.retryable_on)(&err) {
                return Err(err);
            }

            let elapsed = start.elapsed();
            if let Some(max_wait) = self.max_wait
                && elapsed >= max_wait
            {
                return Err(Error::RetryExhausted {
                    operation,
                    attempts,
                    elapsed,
                    last: Box::new(err),
                });
            }

            debug!(
                operation,
                attempt = attempts,
                error = %err,
                "Retrying after {:?}",
                self.interval
            );
            sleep(self.interval).await;
        }
    }
}
