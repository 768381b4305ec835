//! Programmatic configuration builder for integration tests

use cadence_config::{Config, LlmConfig, LoggingConfig, RetryConfig, ThrottleConfig, ThrottleProviderConfig};
use secrecy::SecretString;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Config pointed at a mock backend, with fast retries and no throttling
    pub fn new(base_url: &str) -> Self {
        Self {
            config: Config {
                llm: LlmConfig {
                    base_url: base_url.parse().expect("valid URL"),
                    api_key: Some(SecretString::from("test-key")),
                    organization_id: None,
                    project_id: None,
                    model: "mock-model-1".to_owned(),
                    temperature: 1.0,
                    max_tokens: 256,
                    request_timeout: Some("10s".to_owned()),
                },
                retry: RetryConfig {
                    max_attempts: 3,
                    base_delay: "20ms".to_owned(),
                },
                throttle: ThrottleConfig { providers: Vec::new() },
                logging: LoggingConfig::default(),
            },
        }
    }

    /// Send organization and project headers
    pub fn with_organization(mut self, organization: &str, project: &str) -> Self {
        self.config.llm.organization_id = Some(organization.to_owned());
        self.config.llm.project_id = Some(project.to_owned());
        self
    }

    /// Throttle requests to `host`
    pub fn with_throttle(mut self, host: &str, min_interval: &str) -> Self {
        self.config.throttle.providers.push(ThrottleProviderConfig {
            host: host.to_owned(),
            min_interval: min_interval.to_owned(),
        });
        self
    }

    /// Set the connect and read timeout
    pub fn with_request_timeout(mut self, timeout: &str) -> Self {
        self.config.llm.request_timeout = Some(timeout.to_owned());
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
