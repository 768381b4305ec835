use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use crate::{Config, parse_duration};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        raw.parse()
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_llm()?;
        self.validate_retry()?;
        self.validate_throttle()?;
        Ok(())
    }

    fn validate_llm(&self) -> anyhow::Result<()> {
        if self.llm.model.trim().is_empty() {
            anyhow::bail!("llm.model must not be empty");
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            anyhow::bail!("llm.temperature must be between 0.0 and 2.0, got {}", self.llm.temperature);
        }

        if self.llm.max_tokens == 0 {
            anyhow::bail!("llm.max_tokens must be greater than 0");
        }

        if let Some(ref timeout) = self.llm.request_timeout {
            let timeout = parse_duration(timeout).map_err(|e| anyhow::anyhow!("llm.request_timeout: {e}"))?;
            if timeout.is_zero() {
                anyhow::bail!("llm.request_timeout must be greater than 0");
            }
        }

        Ok(())
    }

    fn validate_retry(&self) -> anyhow::Result<()> {
        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }

        parse_duration(&self.retry.base_delay).map_err(|e| anyhow::anyhow!("retry.base_delay: {e}"))?;

        Ok(())
    }

    fn validate_throttle(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();

        for provider in &self.throttle.providers {
            if provider.host.trim().is_empty() {
                anyhow::bail!("throttle provider host must not be empty");
            }

            if !seen.insert(provider.host.to_ascii_lowercase()) {
                anyhow::bail!("throttle provider '{}' is configured more than once", provider.host);
            }

            let interval = parse_duration(&provider.min_interval)
                .map_err(|e| anyhow::anyhow!("throttle provider '{}': {e}", provider.host))?;
            if interval.is_zero() {
                anyhow::bail!("throttle provider '{}' min_interval must be greater than 0", provider.host);
            }
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }
}
