//! Streaming chat-completion client for OpenAI-compatible endpoints
//!
//! [`StreamingChatClient`] turns a conversation into a lazy stream of
//! [`OutputItem`]s: text deltas, completed tool-call batches, terminal error
//! messages, or the [`OutputItem::ToolsUnsupported`] sentinel. Requests pass
//! through a shared [`ThrottleGate`] and a [`RetryPolicy`] before a stream is
//! opened, and an opened stream is always closed, including when the caller
//! drops the output stream early.
//!
//! [`ThrottleGate`]: cadence_ratelimit::ThrottleGate
//! [`RetryPolicy`]: cadence_ratelimit::RetryPolicy

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod accumulator;
pub mod client;
pub mod convert;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod types;

pub use accumulator::{AccumulatorState, ToolCallAccumulator};
pub use client::{OutputStream, StreamingChatClient};
pub use error::{LlmError, TransportError};
pub use transport::{ChunkStream, Transport, openai::OpenAiTransport};
pub use types::{
    ChatRequest, ChatSettings, ChunkChoice, ChunkDelta, CompletionRequest, FunctionCall, FunctionDefinition, Message, OutputItem,
    ResponseChunk, Role, ToolCallDelta, ToolCallObject, ToolDefinition,
};
