//! Bounded exponential backoff for transient API failures
//!
//! Transient errors (network, rate limiting, server errors) are retried
//! with exponential backoff; everything else returns immediately. The
//! classification is string-based over the full error chain, since both
//! the Graph and S3 adapters surface failures as `anyhow` chains.

use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

/// Retry schedule for transient failures
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum attempts per operation (first try included)
    pub max_attempts: u32,
    /// Base delay; doubles on each retry
    pub base_delay: Duration,
    /// Ceiling on the backoff delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before retry number `attempt` (0-based)
    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Determines whether an error is transient (retryable)
///
/// Transient errors include:
/// - Network errors (connection refused, timeout, DNS)
/// - Rate limiting (HTTP 429)
/// - Server errors (HTTP 5xx)
pub fn is_transient_error(err: &anyhow::Error) -> bool {
    let err_str = format!("{err:#}").to_lowercase();

    // Network errors
    if err_str.contains("network")
        || err_str.contains("connection")
        || err_str.contains("timeout")
        || err_str.contains("dns")
        || err_str.contains("reset by peer")
        || err_str.contains("broken pipe")
    {
        return true;
    }

    // Rate limiting
    if err_str.contains("429")
        || err_str.contains("too many requests")
        || err_str.contains("rate limit")
        || err_str.contains("slowdown")
    {
        return true;
    }

    // Server errors (5xx)
    if err_str.contains("500")
        || err_str.contains("502")
        || err_str.contains("503")
        || err_str.contains("504")
        || err_str.contains("server error")
    {
        return true;
    }

    false
}

/// Executes an async operation with exponential backoff retry
///
/// Only retries on transient errors; non-transient errors are returned
/// immediately. The final transient error is returned once attempts are
/// exhausted.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, operation_name: &str, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(
                        operation = operation_name,
                        attempt, "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) => {
                if attempt + 1 >= policy.max_attempts || !is_transient_error(&err) {
                    return Err(err);
                }
                let delay = policy.delay_for(attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
