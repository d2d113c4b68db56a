//! Bounded retry for processing runs
//!
//! A failed run is retried from the top after a delay, up to
//! [`RetryConfig::max_attempts`] attempts in total. The defaults give a fixed
//! one-second delay; the backoff multiplier and jitter are kept configurable.
//!
//! # Example
//!
//! ```no_run
//! use game_ingest::config::RetryConfig;
//! use game_ingest::retry::{IsRetryable, run_with_retry};
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! run_with_retry(&config, |_attempt| async { Ok::<_, MyError>(()) }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{Error, TaskError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if running the same work again could succeed
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // The task vanished, or was cancelled/completed before pickup
            Error::Task(TaskError::NotFound { .. } | TaskError::InvalidState { .. }) => false,
            // Shutdown in progress
            Error::ShuttingDown => false,
            // Bad input never fixes itself
            Error::Config { .. } | Error::Validation(_) => false,
            // A source directory that disappeared will not come back
            Error::PathNotFound { .. } => false,
            // Tool failures, I/O, placement and database hiccups rerun from the top
            Error::Database(_)
            | Error::Sqlx(_)
            | Error::Extraction(_)
            | Error::Placement(_)
            | Error::Metadata(_)
            | Error::Io(_)
            | Error::Network(_)
            | Error::Serialization(_)
            | Error::ApiServerError(_)
            | Error::Other(_) => true,
        }
    }
}

/// Run `operation` until it succeeds, fails permanently or runs out of attempts
///
/// `operation` receives the 1-based attempt number. The last error is returned
/// once [`RetryConfig::max_attempts`] attempts have failed; a `max_attempts` of
/// zero still runs the operation once.
pub async fn run_with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    let mut delay = config.initial_delay;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let wait = if config.jitter { add_jitter(delay) } else { delay };

                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = wait.as_millis(),
                    "Operation failed, retrying"
                );

                tokio::time::sleep(wait).await;

                attempt += 1;
                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Stretch a delay by a random factor between 1.0 and 2.0
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
