//! Streaming chat client
//!
//! Each call to [`StreamingChatClient::chat_completion`] returns a lazy
//! stream. Nothing is sent until it is first polled; then the request passes
//! the throttle gate, the retry policy opens the upstream stream, and chunks
//! are driven through a [`ToolCallAccumulator`].

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cadence_config::Config;
use cadence_ratelimit::{RetryPolicy, ThrottleGate, create_retry_policy};
use futures_util::{Stream, StreamExt};

use crate::accumulator::ToolCallAccumulator;
use crate::error::{LlmError, TransportError};
use crate::transport::openai::OpenAiTransport;
use crate::transport::{ChunkStream, Transport};
use crate::types::output::{CONNECTION_ERROR_MESSAGE, GENERIC_ERROR_MESSAGE, RATE_LIMIT_ERROR_MESSAGE};
use crate::types::{ChatRequest, ChatSettings, CompletionRequest, OutputItem, ResponseChunk};

/// Lazy, single-pass stream of output items for one chat completion
pub type OutputStream = Pin<Box<dyn Stream<Item = OutputItem> + Send>>;

struct Shared {
    transport: Arc<dyn Transport>,
    throttle: ThrottleGate,
    retry: RetryPolicy,
    settings: ChatSettings,
    tools_supported: AtomicBool,
}

/// Chat client for one endpoint
///
/// Clones share the tool-capability flag. Once the endpoint reports that
/// the model rejects tools, no later call from this client attaches them.
#[derive(Clone)]
pub struct StreamingChatClient {
    shared: Arc<Shared>,
}

impl StreamingChatClient {
    /// Create a client over an existing transport
    pub fn new(
        transport: Arc<dyn Transport>,
        throttle: ThrottleGate,
        retry: RetryPolicy,
        settings: ChatSettings,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                throttle,
                retry,
                settings,
                tools_supported: AtomicBool::new(true),
            }),
        }
    }

    /// Create a client for the configured OpenAI-compatible endpoint
    ///
    /// The throttle gate is passed in so every client in the process shares
    /// one instance.
    pub fn from_config(config: &Config, throttle: ThrottleGate) -> Result<Self, LlmError> {
        let transport = OpenAiTransport::from_config(&config.llm)?;
        let retry = create_retry_policy(&config.retry).map_err(|e| LlmError::Config(e.to_string()))?;
        let settings = ChatSettings {
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        };

        tracing::info!(base_url = %config.llm.base_url, model = %settings.model, "chat client initialized");

        Ok(Self::new(Arc::new(transport), throttle, retry, settings))
    }

    /// Whether tools are still attached to requests
    pub fn supports_tools(&self) -> bool {
        self.shared.tools_supported.load(Ordering::Acquire)
    }

    /// Generation settings applied to every request
    pub fn settings(&self) -> &ChatSettings {
        &self.shared.settings
    }

    /// Stream a completion for `request`
    ///
    /// Failures never escape as errors. The stream ends after at most one
    /// [`OutputItem::Error`] or [`OutputItem::ToolsUnsupported`] item, and an
    /// opened upstream stream is closed exactly once, including when the
    /// returned stream is dropped early.
    pub fn chat_completion(&self, request: ChatRequest) -> OutputStream {
        let call = Call {
            shared: Arc::clone(&self.shared),
            phase: Phase::Connect(request),
            stream: StreamGuard::default(),
            accumulator: ToolCallAccumulator::new(),
            pending: VecDeque::new(),
        };

        Box::pin(futures_util::stream::unfold(call, Call::next_item).fuse())
    }
}

impl fmt::Debug for StreamingChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingChatClient")
            .field("endpoint", &self.shared.transport.endpoint())
            .field("settings", &self.shared.settings)
            .field("retry", &self.shared.retry)
            .field("tools_supported", &self.supports_tools())
            .finish_non_exhaustive()
    }
}

enum Phase {
    Connect(ChatRequest),
    Streaming,
    Finished,
}

/// State of one in-flight chat completion
struct Call {
    shared: Arc<Shared>,
    phase: Phase,
    stream: StreamGuard,
    accumulator: ToolCallAccumulator,
    pending: VecDeque<OutputItem>,
}

impl Call {
    async fn next_item(mut self) -> Option<(OutputItem, Self)> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some((item, self));
            }

            match std::mem::replace(&mut self.phase, Phase::Finished) {
                Phase::Connect(request) => self.connect(&request).await,
                Phase::Streaming => self.pump().await,
                Phase::Finished => {
                    self.stream.close();
                    return None;
                }
            }
        }
    }

    async fn connect(&mut self, request: &ChatRequest) {
        let shared = Arc::clone(&self.shared);
        let tools_supported = shared.tools_supported.load(Ordering::Acquire);
        let completion = CompletionRequest::build(request, &shared.settings, tools_supported);

        tracing::debug!(
            model = %completion.model,
            messages = completion.messages.len(),
            tools = completion.tools.as_ref().map_or(0, Vec::len),
            "starting chat completion"
        );

        let transport = shared.transport.as_ref();
        shared.throttle.admit(transport.endpoint()).await;

        let completion = &completion;
        let opened = shared
            .retry
            .run(move |attempt| async move {
                if attempt > 0 {
                    tracing::debug!(attempt = attempt + 1, "reopening chat stream");
                }
                transport.open_stream(completion).await
            })
            .await;

        match opened {
            Ok(stream) => {
                self.stream.attach(stream);
                self.phase = Phase::Streaming;
            }
            Err(error) => self.fail(&error),
        }
    }

    async fn pump(&mut self) {
        match self.stream.next().await {
            Some(Ok(chunk)) => {
                self.pending.extend(self.accumulator.drive(&chunk));
                self.phase = Phase::Streaming;
            }
            Some(Err(error)) => {
                self.stream.close();
                self.fail(&error);
            }
            None => {
                self.stream.close();
                if let Some(batch) = self.accumulator.flush() {
                    self.pending.push_back(OutputItem::ToolCalls(batch));
                }
                tracing::debug!("chat stream finished");
            }
        }
    }

    fn fail(&mut self, error: &TransportError) {
        let item = if error.is_tools_unsupported() {
            self.shared.tools_supported.store(false, Ordering::Release);
            tracing::warn!(error = %error, "model does not support tools, disabling tools for this client");
            OutputItem::ToolsUnsupported
        } else {
            let settings = &self.shared.settings;
            tracing::error!(
                endpoint = %self.shared.transport.endpoint(),
                model = %settings.model,
                temperature = settings.temperature,
                error = %error,
                "chat completion failed"
            );
            OutputItem::Error(error_message(error).to_owned())
        };

        self.pending.push_back(item);
    }
}

fn error_message(error: &TransportError) -> &'static str {
    match error {
        TransportError::Connection(_) => CONNECTION_ERROR_MESSAGE,
        TransportError::RateLimited(_) => RATE_LIMIT_ERROR_MESSAGE,
        _ => GENERIC_ERROR_MESSAGE,
    }
}

/// Owns the upstream stream and closes it once, at the latest on drop
#[derive(Default)]
struct StreamGuard {
    inner: Option<Box<dyn ChunkStream>>,
}

impl StreamGuard {
    fn attach(&mut self, stream: Box<dyn ChunkStream>) {
        self.inner = Some(stream);
    }

    async fn next(&mut self) -> Option<Result<ResponseChunk, TransportError>> {
        match self.inner.as_mut() {
            Some(stream) => stream.next().await,
            None => None,
        }
    }

    fn close(&mut self) {
        if let Some(mut stream) = self.inner.take()
            && let Err(error) = stream.close()
        {
            tracing::warn!(error = %error, "failed to close chat stream");
        }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if self.inner.is_some() {
            tracing::debug!("chat stream dropped before completion");
        }
        self.close();
    }
}
