use super::ToolCallObject;

/// Message emitted when the endpoint cannot be reached
pub const CONNECTION_ERROR_MESSAGE: &str = "Error calling the chat endpoint: Connection error. \
Failed to connect to the LLM API. Check the configurations and the reachability of the LLM \
backend. See the logs for details.";

/// Message emitted when rate-limit retries are exhausted
pub const RATE_LIMIT_ERROR_MESSAGE: &str =
    "Error calling the chat endpoint: Rate limit exceeded. Please try again later. See the logs for details.";

/// Message emitted for every other failure
pub const GENERIC_ERROR_MESSAGE: &str = "Error calling the chat endpoint: Error occurred while \
generating response. See the logs for details.";

/// Item delivered to the consumer of a chat stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputItem {
    /// Text fragment; empty when the chunk carried no content
    Text(String),
    /// Completed tool calls, ordered by index
    ToolCalls(Vec<ToolCallObject>),
    /// Human-readable terminal error
    Error(String),
    /// The model rejected tools; the caller should retry without them
    ToolsUnsupported,
}
