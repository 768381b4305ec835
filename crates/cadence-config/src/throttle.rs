use serde::Deserialize;

/// Minimum request intervals for providers with account-wide quotas
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThrottleConfig {
    /// Throttled providers; an empty list disables throttling
    #[serde(default = "default_providers")]
    pub providers: Vec<ThrottleProviderConfig>,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
        }
    }
}

/// A provider matched by hostname that must be throttled
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThrottleProviderConfig {
    /// Hostname (or domain suffix) of the provider, e.g. `mistral.ai`
    pub host: String,
    /// Minimum time between consecutive requests (e.g. "1s")
    pub min_interval: String,
}

fn default_providers() -> Vec<ThrottleProviderConfig> {
    // Mistral allows one request per second per account
    vec![ThrottleProviderConfig {
        host: "mistral.ai".to_owned(),
        min_interval: "1s".to_owned(),
    }]
}
