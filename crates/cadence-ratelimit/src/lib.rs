#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

//! Request pacing for rate-sensitive LLM providers
//!
//! [`ThrottleGate`] enforces a process-wide minimum interval between
//! requests to a provider, and [`RetryPolicy`] backs off exponentially when a
//! provider still answers with a rate-limit signal.

mod error;
mod retry;
mod throttle;

pub use error::RateLimitError;
pub use retry::{RateLimitSignal, RetryPolicy};
pub use throttle::{ThrottleGate, ThrottleRule};

use cadence_config::{RetryConfig, ThrottleConfig};

/// Create the shared throttle gate from configuration
pub fn create_throttle_gate(config: &ThrottleConfig) -> Result<ThrottleGate, RateLimitError> {
    ThrottleGate::from_config(config)
}

/// Create a retry policy from configuration
pub fn create_retry_policy(config: &RetryConfig) -> Result<RetryPolicy, RateLimitError> {
    RetryPolicy::from_config(config)
}
