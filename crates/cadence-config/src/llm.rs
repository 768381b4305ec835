use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Configuration for the upstream OpenAI-compatible chat endpoint
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Base URL of the API, e.g. `https://api.openai.com/v1`
    pub base_url: Url,
    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Organization identifier (`OpenAI-Organization` header)
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Project identifier (`OpenAI-Project` header)
    #[serde(default)]
    pub project_id: Option<String>,
    /// Model identifier
    pub model: String,
    /// Sampling temperature (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum tokens to generate per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Connect timeout and longest idle gap between streamed reads (e.g. "60s")
    ///
    /// Long generations that keep sending chunks are never cut off.
    #[serde(default)]
    pub request_timeout: Option<String>,
}

const fn default_temperature() -> f64 {
    1.0
}

const fn default_max_tokens() -> u32 {
    256
}
