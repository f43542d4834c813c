//! Exponential-backoff retry wrapper used by every provider adapter.
//!
//! # Example
//!
//! ```rust
//! use agentloop::retry::{retry_async, RetryConfig};
//! use agentloop::LlmError;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = RetryConfig {
//!     enabled: true,
//!     max_retries: 2,
//!     initial_delay: 0.01,
//!     max_delay: 0.05,
//!     exponential_base: 2.0,
//! };
//!
//! let result: Result<u32, LlmError> = retry_async(|| async { Ok(42) }, &config, None).await;
//! assert_eq!(result.unwrap(), 42);
//! # }
//! ```

use crate::agentloop::error::LlmError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked before each backoff sleep with the attempt number
/// (1-based) and the error that triggered the retry.
pub type RetryCallback = Arc<dyn Fn(usize, &LlmError) + Send + Sync>;

/// Backoff policy. Delays are in seconds.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// When `false`, the first failure is returned unwrapped.
    pub enabled: bool,
    /// Number of retries after the initial attempt.
    pub max_retries: usize,
    /// Delay before the first retry.
    pub initial_delay: f64,
    /// Upper bound on any single delay.
    pub max_delay: f64,
    /// Multiplier applied per retry.
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            enabled: true,
            max_retries: 3,
            initial_delay: 1.0,
            max_delay: 60.0,
            exponential_base: 2.0,
        }
    }
}

/// Run `op` until it succeeds or the retry budget is exhausted.
///
/// Each failed attempt sleeps `initial_delay * exponential_base^(n-1)` seconds
/// (capped at `max_delay`) before the next one.  On exhaustion the last error
/// is wrapped in [`LlmError::RetryExhausted`] with the total attempt count.
/// With `enabled: false` the original error of the single attempt is returned
/// as-is.
pub async fn retry_async<T, Fut, F>(
    mut op: F,
    config: &RetryConfig,
    on_retry: Option<&RetryCallback>,
) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    if !config.enabled {
        return op().await;
    }

    let mut attempts = 0usize;
    loop {
        attempts += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempts > config.max_retries {
                    return Err(LlmError::RetryExhausted {
                        attempts,
                        last_error: Box::new(err),
                    });
                }
                if let Some(callback) = on_retry {
                    callback(attempts, &err);
                }
                let delay = (config.initial_delay
                    * config.exponential_base.powi(attempts as i32 - 1))
                .min(config.max_delay);
                if log::log_enabled!(log::Level::Warn) {
                    log::warn!(
                        "retry_async: attempt {} failed ({}), retrying in {:.2}s",
                        attempts,
                        err,
                        delay
                    );
                }
                tokio::time::sleep(Duration::from_secs_f64(delay)).await;
            }
        }
    }
}
