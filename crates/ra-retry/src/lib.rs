//! Generic retry envelope: wraps any fallible async operation with
//! exponential backoff and jitter, classifying errors as retryable or fatal.
//!
//! Unlike the inlined `execute_with_retry` pattern this crate is grounded
//! on, `with_retry` is a free function usable by the Provider, the Memory
//! Store, and the Sub-Conversation Manager alike.

use rand::Rng;
use ra_domain::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{info_span, warn};

pub use ra_domain::config::RetryConfig;

/// Computes the delay before attempt `n` (1-indexed), per spec:
/// `min(initial * factor^(n-1), max_delay) * U`, `U ~ Uniform(0.5, 1.5)` when
/// jitter is enabled, else `U = 1`.
pub fn delay_for_attempt(config: &RetryConfig, attempt: u32) -> Duration {
    let exp = config.backoff_factor.powi(attempt as i32 - 1);
    let base = (config.initial_delay.as_secs_f64() * exp).min(config.max_delay.as_secs_f64());
    let jitter = if config.jitter {
        rand::thread_rng().gen_range(0.5..1.5)
    } else {
        1.0
    };
    Duration::from_secs_f64((base * jitter).max(0.0))
}

/// Upper bound on the jittered delay for attempt `n`, used by tests that
/// verify total elapsed sleep time stays within the documented bound.
pub fn max_delay_for_attempt(config: &RetryConfig, attempt: u32) -> Duration {
    let exp = config.backoff_factor.powi(attempt as i32 - 1);
    let base = (config.initial_delay.as_secs_f64() * exp).min(config.max_delay.as_secs_f64());
    Duration::from_secs_f64(base * 1.5)
}

/// Runs `operation` up to `config.max_attempts` times, sleeping a jittered
/// exponential backoff between attempts, stopping immediately on a fatal
/// error. `op_name` is attached to the span for observability.
pub async fn with_retry<F, Fut, T>(op_name: &str, config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let span = info_span!("with_retry", op_name = op_name, retry.attempt = tracing::field::Empty);
    let _enter = span.enter();

    let mut last_err: Option<Error> = None;
    for attempt in 1..=config.max_attempts {
        span.record("retry.attempt", attempt);
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() {
                    return Err(err);
                }
                warn!(op_name, attempt, error = %err, "retryable failure");
                last_err = Some(err);
                if attempt < config.max_attempts {
                    let delay = delay_for_attempt(config, attempt);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(last_err.unwrap_or_else(|| Error::Other(format!("{op_name}: exhausted retries with no error recorded"))))
}
