use cadence_ratelimit::RateLimitSignal;
use thiserror::Error;

/// Phrase upstream APIs use when a model rejects tool-capable requests
const TOOLS_UNSUPPORTED_MARKER: &str = "does not support tools";

/// Errors raised while setting up a chat client
#[derive(Debug, Error)]
pub enum LlmError {
    /// Invalid client configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Failures reported by a [`Transport`](crate::Transport) or its streams
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The endpoint could not be reached
    #[error("connection failed: {0}")]
    Connection(String),

    /// The endpoint rejected the request for rate limiting (HTTP 429)
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The model rejects requests that declare tools
    #[error("model does not support tools: {0}")]
    ToolsUnsupported(String),

    /// Any other upstream API failure
    #[error("{}", describe_api_failure(.status, .message))]
    Api {
        /// HTTP status code, when the failure came with one
        status: Option<u16>,
        /// Upstream error message
        message: String,
    },

    /// The response stream broke after it was opened
    #[error("stream error: {0}")]
    Stream(String),

    /// Closing a stream failed
    #[error("failed to close stream: {0}")]
    Cleanup(String),
}

impl TransportError {
    /// Whether the model refused the request because it declared tools
    ///
    /// Transports that cannot classify this themselves surface it as a
    /// generic API error, so the message text is checked as well.
    pub fn is_tools_unsupported(&self) -> bool {
        match self {
            Self::ToolsUnsupported(_) => true,
            Self::Api { message, .. } => mentions_tools_unsupported(message),
            _ => false,
        }
    }
}

impl RateLimitSignal for TransportError {
    fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

#[allow(clippy::ref_option)]
fn describe_api_failure(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("upstream returned {status}: {message}"),
        None => format!("upstream error: {message}"),
    }
}

/// Whether an upstream error message reports missing tool support
pub(crate) fn mentions_tools_unsupported(message: &str) -> bool {
    message.to_ascii_lowercase().contains(TOOLS_UNSUPPORTED_MARKER)
}
