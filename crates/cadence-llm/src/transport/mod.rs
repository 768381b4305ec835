//! Transport trait and implementations for chat endpoints

pub mod openai;
#[cfg(test)]
pub(crate) mod scripted;

use async_trait::async_trait;
use futures_util::Stream;

use crate::error::TransportError;
use crate::types::{CompletionRequest, ResponseChunk};

/// Opens streaming chat completions against one endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    /// Endpoint identifier, matched against throttle rules
    fn endpoint(&self) -> &str;

    /// Send `request` and return the chunk stream once the upstream accepted it
    async fn open_stream(&self, request: &CompletionRequest) -> Result<Box<dyn ChunkStream>, TransportError>;
}

/// Stream of decoded chunks that must be closed explicitly
///
/// After `close` returns, the stream yields no further items. Calling
/// `close` again has no effect.
pub trait ChunkStream: Stream<Item = Result<ResponseChunk, TransportError>> + Send + Unpin {
    /// Release the underlying connection
    fn close(&mut self) -> Result<(), TransportError>;
}
