use std::fmt;
use std::future::Future;
use std::time::Duration;

use cadence_config::{RetryConfig, parse_duration};

use crate::error::RateLimitError;

/// Errors that can tell whether the upstream refused the request for rate limiting
pub trait RateLimitSignal {
    /// Whether this failure is a rate-limit rejection worth retrying
    fn is_rate_limited(&self) -> bool;
}

/// Bounded exponential backoff for rate-limited requests
///
/// Only failures that report [`RateLimitSignal::is_rate_limited`] are
/// retried; anything else is returned to the caller untouched on the first
/// occurrence. The delay before retry `n` (0-based) is `base_delay * 2^n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy making at most `max_attempts` attempts (at least one)
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Create from configuration
    pub fn from_config(config: &RetryConfig) -> Result<Self, RateLimitError> {
        let base_delay = parse_duration(&config.base_delay).map_err(RateLimitError::Config)?;
        Ok(Self::new(config.max_attempts, base_delay))
    }

    /// Total attempts, including the first
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the first retry
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay after the failed attempt with the given 0-based index
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(attempt))
    }

    /// Run `operation`, retrying rate-limited failures with backoff
    ///
    /// The closure receives the 0-based attempt index. Once attempts are
    /// exhausted the last rate-limit error is returned.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RateLimitSignal + fmt::Display,
    {
        let mut attempt = 0;

        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(attempt = attempt + 1, "request succeeded after rate-limit retry");
                    }
                    return Ok(value);
                }
                Err(error) if error.is_rate_limited() && attempt + 1 < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay = ?delay,
                        error = %error,
                        "rate limited, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    if error.is_rate_limited() {
                        tracing::error!(attempts = self.max_attempts, "rate limit retries exhausted");
                    }
                    return Err(error);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}
