//! Provider-agnostic request, chunk and output types

pub mod chunk;
pub mod message;
pub mod output;
pub mod request;
pub mod tool;

pub use chunk::{ChunkChoice, ChunkDelta, ResponseChunk, ToolCallDelta};
pub use message::{FunctionCall, Message, Role, ToolCallObject};
pub use output::OutputItem;
pub use request::{ChatRequest, ChatSettings, CompletionRequest};
pub use tool::{FunctionDefinition, ToolDefinition};
