//! Retry with exponential backoff for calls leaving the process.
//!
//! The caller decides which failures are transient through [`Retryable`];
//! every wait and every attempt races the caller's [`CancellationToken`], so a
//! cancelled call stops immediately and is never retried.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Configuration for retry behavior.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Backoff before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single backoff.
    pub max_backoff: Duration,
    /// Growth factor applied per attempt.
    pub backoff_multiplier: u32,
}

impl Default for RetryConfig {
    /// Two retries, waiting 100ms then 400ms.
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            backoff_multiplier: 4,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn no_retry() -> Self {
        Self::with_max_retries(0)
    }

    /// Backoff to wait after the failed attempt number `attempt` (0-based).
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Classifies an error as transient.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// The call was abandoned because its cancellation token fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Run `f` until it succeeds, fails permanently, exhausts `config`, or
/// `cancel` fires.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    cancel: &CancellationToken,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + From<Cancelled> + std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(Cancelled.into());
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Cancelled.into()),
            outcome = f() => outcome,
        };

        let err = match outcome {
            Ok(result) => {
                if attempt > 0 {
                    info!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        "Call succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => err,
        };

        if !err.is_retryable() {
            return Err(err);
        }

        if attempt >= config.max_retries {
            warn!(
                operation = operation_name,
                attempt = attempt + 1,
                error = %err,
                "Call failed after max retries"
            );
            return Err(err);
        }

        let backoff = config.backoff_duration(attempt);
        warn!(
            operation = operation_name,
            attempt = attempt + 1,
            error = %err,
            backoff_ms = backoff.as_millis() as u64,
            "Call failed, retrying after backoff"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Cancelled.into()),
            _ = sleep(backoff) => {}
        }
        attempt += 1;
    }
}
