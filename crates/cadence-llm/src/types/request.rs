use serde::{Deserialize, Serialize};

use super::{Message, ToolDefinition};

/// Caller-facing chat request
///
/// The system prompt and tools travel separately from the conversation so the
/// client can decide what reaches the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation history, oldest first
    pub messages: Vec<Message>,
    /// Optional system prompt, prepended on the outgoing copy only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

impl ChatRequest {
    /// Create a request from a conversation
    pub const fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            system: None,
            tools: None,
        }
    }

    /// Set the system prompt
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Offer tools to the model
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self
    }
}

/// Generation settings applied to every request of a client
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl ChatSettings {
    /// Settings for `model` with default temperature and token limit
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 1.0,
            max_tokens: 256,
        }
    }
}

/// Request as sent to a transport
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Messages including the prepended system prompt
    pub messages: Vec<Message>,
    /// Sampling temperature
    pub temperature: f64,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Tools, present only when offered and supported
    pub tools: Option<Vec<ToolDefinition>>,
}

impl CompletionRequest {
    /// Build the outgoing request without touching the caller's conversation
    ///
    /// A non-empty system prompt becomes a leading system message. Tools are
    /// attached only when some were supplied and `tools_supported` is set.
    pub fn build(request: &ChatRequest, settings: &ChatSettings, tools_supported: bool) -> Self {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = request.system.as_deref()
            && !system.is_empty()
        {
            messages.push(Message::system(system));
        }
        messages.extend(request.messages.iter().cloned());

        let tools = if tools_supported {
            request.tools.clone().filter(|tools| !tools.is_empty())
        } else {
            None
        };

        Self {
            model: settings.model.clone(),
            messages,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            tools,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn weather_tool() -> ToolDefinition {
        ToolDefinition::function(
            "get_weather",
            "Get the weather",
            serde_json::json!({"type": "object"}),
        )
    }

    #[test]
    fn system_prompt_is_prepended_on_copy() {
        let request = ChatRequest::new(vec![Message::user("Hi")]).with_system("Be brief");
        let settings = ChatSettings::new("gpt-4o");

        let completion = CompletionRequest::build(&request, &settings, true);

        assert_eq!(completion.messages.len(), 2);
        assert_eq!(completion.messages[0].role, Role::System);
        assert_eq!(completion.messages[0].content, "Be brief");
        assert_eq!(completion.messages[1].content, "Hi");
        assert_eq!(request.messages.len(), 1);
    }

    #[test]
    fn empty_system_prompt_is_skipped() {
        let request = ChatRequest::new(vec![Message::user("Hi")]).with_system("");
        let completion = CompletionRequest::build(&request, &ChatSettings::new("m"), true);

        assert_eq!(completion.messages.len(), 1);
        assert_eq!(completion.messages[0].role, Role::User);
    }

    #[test]
    fn tools_attached_only_when_supported() {
        let request = ChatRequest::new(vec![Message::user("Hi")]).with_tools(vec![weather_tool()]);
        let settings = ChatSettings::new("m");

        let with = CompletionRequest::build(&request, &settings, true);
        assert_eq!(with.tools.as_ref().map(Vec::len), Some(1));

        let without = CompletionRequest::build(&request, &settings, false);
        assert!(without.tools.is_none());
    }

    #[test]
    fn empty_tool_list_is_not_attached() {
        let request = ChatRequest::new(vec![Message::user("Hi")]).with_tools(Vec::new());
        let completion = CompletionRequest::build(&request, &ChatSettings::new("m"), true);

        assert!(completion.tools.is_none());
    }

    #[test]
    fn settings_flow_into_request() {
        let settings = ChatSettings {
            model: "mistral-large".to_owned(),
            temperature: 0.2,
            max_tokens: 64,
        };
        let completion =
            CompletionRequest::build(&ChatRequest::new(Vec::new()), &settings, true);

        assert_eq!(completion.model, "mistral-large");
        assert!((completion.temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(completion.max_tokens, 64);
    }
}
