//! Conversion between internal types and `OpenAI` wire format

use serde::Deserialize;

use crate::protocol::openai::{
    OpenAiErrorResponse, OpenAiFunction, OpenAiFunctionCall, OpenAiMessage, OpenAiRequest, OpenAiStreamChoice,
    OpenAiStreamChunk, OpenAiStreamToolCall, OpenAiTool, OpenAiToolCall,
};
use crate::types::{
    ChunkChoice, ChunkDelta, CompletionRequest, Message, ResponseChunk, Role, ToolCallDelta, ToolCallObject,
    ToolDefinition,
};

// -- Outbound: internal request -> OpenAI wire request --

impl From<&CompletionRequest> for OpenAiRequest {
    fn from(req: &CompletionRequest) -> Self {
        Self {
            model: req.model.clone(),
            messages: req.messages.iter().map(Into::into).collect(),
            temperature: req.temperature,
            max_tokens: req.max_tokens,
            stream: true,
            tools: req.tools.as_ref().map(|tools| tools.iter().map(Into::into).collect()),
        }
    }
}

impl From<&Message> for OpenAiMessage {
    fn from(msg: &Message) -> Self {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };

        // Assistant turns that only carry tool calls send no content
        let content = if msg.content.is_empty() && msg.tool_calls.is_some() {
            None
        } else {
            Some(msg.content.clone())
        };

        Self {
            role: role.to_owned(),
            content,
            name: msg.name.clone(),
            tool_calls: msg
                .tool_calls
                .as_ref()
                .map(|calls| calls.iter().map(Into::into).collect()),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

impl From<&ToolCallObject> for OpenAiToolCall {
    fn from(call: &ToolCallObject) -> Self {
        Self {
            id: call.id.clone(),
            tool_type: call.tool_type.clone(),
            function: OpenAiFunctionCall {
                name: call.function.name.clone(),
                arguments: call.function.arguments.clone(),
            },
        }
    }
}

impl From<&ToolDefinition> for OpenAiTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            tool_type: tool.tool_type.clone(),
            function: OpenAiFunction {
                name: tool.function.name.clone(),
                description: tool.function.description.clone(),
                parameters: tool.function.parameters.clone(),
            },
        }
    }
}

// -- Inbound: OpenAI stream chunk -> internal chunk --

impl From<OpenAiStreamChunk> for ResponseChunk {
    fn from(chunk: OpenAiStreamChunk) -> Self {
        Self {
            choices: chunk.choices.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<OpenAiStreamChoice> for ChunkChoice {
    fn from(choice: OpenAiStreamChoice) -> Self {
        Self {
            delta: ChunkDelta {
                content: choice.delta.content,
                tool_calls: choice
                    .delta
                    .tool_calls
                    .map(|calls| calls.into_iter().map(Into::into).collect()),
            },
            finish_reason: choice.finish_reason,
        }
    }
}

impl From<OpenAiStreamToolCall> for ToolCallDelta {
    fn from(call: OpenAiStreamToolCall) -> Self {
        let (name, arguments) = call
            .function
            .map_or((None, None), |function| (function.name, function.arguments));

        Self {
            index: call.index,
            id: call.id,
            tool_type: call.tool_type,
            name,
            arguments,
        }
    }
}

/// Extract the upstream error message from a response body
///
/// Falls back to the raw body when it is not an `OpenAI` error envelope.
pub fn error_message_from_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| reported_error(&value, body))
        .unwrap_or_else(|| body.trim().to_owned())
}

/// Error message of a payload whose `error` member is set
///
/// Falls back to the raw payload when the error carries no message. Returns
/// `None` when the payload does not report an error.
pub fn reported_error(value: &serde_json::Value, raw: &str) -> Option<String> {
    if !value.is_object() {
        return None;
    }
    let error = OpenAiErrorResponse::deserialize(value).ok()?.error?;
    Some(error.message().map_or_else(|| raw.trim().to_owned(), str::to_owned))
}
