#![allow(clippy::must_use_candidate)]

//! Configuration for the cadence streaming chat client
//!
//! Loaded from TOML with `{{ env.VAR }}` placeholder expansion

mod env;
pub mod llm;
mod loader;
pub mod logging;
pub mod retry;
pub mod throttle;

use std::time::Duration;

use serde::Deserialize;

pub use llm::*;
pub use logging::*;
pub use retry::*;
pub use throttle::*;

/// Top-level configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Upstream chat endpoint configuration
    pub llm: LlmConfig,
    /// Backoff policy for rate-limited connection attempts
    #[serde(default)]
    pub retry: RetryConfig,
    /// Minimum request intervals for rate-sensitive providers
    #[serde(default)]
    pub throttle: ThrottleConfig,
    /// Log output configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Parse a human-readable duration such as `"1s"` or `"250ms"`
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    duration_str::parse(value).map_err(|e| format!("invalid duration '{value}': {e}"))
}
