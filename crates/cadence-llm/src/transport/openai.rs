//! OpenAI-compatible transport over HTTP and server-sent events

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures_util::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{ChunkStream, Transport};
use crate::convert::openai::{error_message_from_body, reported_error};
use crate::error::{LlmError, TransportError, mentions_tools_unsupported};
use crate::protocol::openai::{OpenAiRequest, OpenAiStreamChunk};
use crate::types::{CompletionRequest, ResponseChunk};

const ORGANIZATION_HEADER: &str = "openai-organization";
const PROJECT_HEADER: &str = "openai-project";

type EventStream = Pin<Box<dyn Stream<Item = Result<Event, EventStreamError<reqwest::Error>>> + Send>>;

/// Transport for `POST {base_url}/chat/completions` with `stream: true`
pub struct OpenAiTransport {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl OpenAiTransport {
    /// Create a transport with a default HTTP client
    pub fn new(base_url: Url, api_key: Option<SecretString>) -> Self {
        Self::with_client(Client::new(), base_url, api_key)
    }

    fn with_client(client: Client, base_url: Url, api_key: Option<SecretString>) -> Self {
        let mut endpoint = String::from(base_url);
        endpoint.truncate(endpoint.trim_end_matches('/').len());
        Self {
            client,
            endpoint,
            api_key,
        }
    }

    /// Create from endpoint configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Config` if the timeout or organization/project
    /// headers are invalid, or the HTTP client cannot be built.
    pub fn from_config(config: &cadence_config::LlmConfig) -> Result<Self, LlmError> {
        let mut headers = HeaderMap::new();
        if let Some(organization) = &config.organization_id {
            headers.insert(ORGANIZATION_HEADER, header_value(organization, "organization_id")?);
        }
        if let Some(project) = &config.project_id {
            headers.insert(PROJECT_HEADER, header_value(project, "project_id")?);
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = &config.request_timeout {
            let timeout = cadence_config::parse_duration(timeout).map_err(LlmError::Config)?;
            builder = builder.connect_timeout(timeout).read_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| LlmError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client, config.base_url.clone(), config.api_key.clone()))
    }

    /// Build the chat completions URL
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }
}

fn header_value(value: &str, field: &str) -> Result<HeaderValue, LlmError> {
    HeaderValue::from_str(value).map_err(|_| LlmError::Config(format!("llm.{field} is not a valid header value")))
}

/// Map a rejected response to its error kind
fn classify_rejection(status: StatusCode, body: &str) -> TransportError {
    let message = error_message_from_body(body);

    if status == StatusCode::TOO_MANY_REQUESTS {
        TransportError::RateLimited(message)
    } else if mentions_tools_unsupported(&message) {
        TransportError::ToolsUnsupported(message)
    } else {
        TransportError::Api {
            status: Some(status.as_u16()),
            message,
        }
    }
}

impl fmt::Debug for OpenAiTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiTransport")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for OpenAiTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn open_stream(&self, request: &CompletionRequest) -> Result<Box<dyn ChunkStream>, TransportError> {
        let wire_request = OpenAiRequest::from(request);

        let mut builder = self.client.post(self.completions_url()).json(&wire_request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(endpoint = %self.endpoint, error = %e, "upstream stream request failed");
            TransportError::Connection(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(endpoint = %self.endpoint, status = %status, "upstream returned error");
            return Err(classify_rejection(status, &body));
        }

        let events: EventStream = Box::pin(response.bytes_stream().eventsource());
        Ok(Box::new(SseChunkStream { events: Some(events) }))
    }
}

/// Chunk stream decoded from server-sent events
///
/// Ends at the `[DONE]` sentinel. Unparseable events are skipped; events
/// with a non-null `error` member become [`TransportError::Api`].
struct SseChunkStream {
    events: Option<EventStream>,
}

impl SseChunkStream {
    fn decode(data: &str) -> Option<Result<ResponseChunk, TransportError>> {
        let parsed = serde_json::from_str::<serde_json::Value>(data).and_then(|value| {
            if let Some(message) = reported_error(&value, data) {
                return Ok(Err(TransportError::Api { status: None, message }));
            }
            serde_json::from_value::<OpenAiStreamChunk>(value).map(|chunk| Ok(ResponseChunk::from(chunk)))
        });

        match parsed {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::debug!(error = %e, data = %data, "skipping unparseable SSE chunk");
                None
            }
        }
    }
}

impl Stream for SseChunkStream {
    type Item = Result<ResponseChunk, TransportError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let Some(events) = self.events.as_mut() else {
                return Poll::Ready(None);
            };

            match events.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    self.events = None;
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(TransportError::Stream(e.to_string()))));
                }
                Poll::Ready(Some(Ok(event))) => {
                    let data = event.data.trim();
                    if data == "[DONE]" {
                        self.events = None;
                        return Poll::Ready(None);
                    }
                    if let Some(item) = Self::decode(data) {
                        return Poll::Ready(Some(item));
                    }
                }
            }
        }
    }
}

impl ChunkStream for SseChunkStream {
    fn close(&mut self) -> Result<(), TransportError> {
        // Dropping the body aborts the connection
        self.events = None;
        Ok(())
    }
}
