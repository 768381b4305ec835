use serde::Deserialize;

/// Exponential backoff applied when opening a stream is rate limited
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total connection attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry; doubled on every further retry
    #[serde(default = "default_base_delay")]
    pub base_delay: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
        }
    }
}

const fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> String {
    "2s".to_owned()
}
