//! Mock OpenAI-compatible backend for integration tests
//!
//! Replays scripted SSE responses on `/v1/chat/completions` and records what
//! it received.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use futures_util::StreamExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Scripted reply to one chat completion request
pub enum MockReply {
    /// Stream these chunk payloads, then `[DONE]`
    Stream(Vec<serde_json::Value>),
    /// Stream these chunk payloads, then keep the connection open
    Hang(Vec<serde_json::Value>),
    /// Stream these chunk payloads with a pause before each, then `[DONE]`
    Slow(Vec<serde_json::Value>, Duration),
    /// Reject with an `OpenAI` error envelope
    Error(StatusCode, &'static str),
}

/// A request as the backend saw it
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub body: serde_json::Value,
    pub headers: HeaderMap,
    pub at: Instant,
}

impl ReceivedRequest {
    /// Header value as a string, if present
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Mock LLM backend
pub struct MockLlm {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockLlmState>,
}

struct MockLlmState {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<ReceivedRequest>>,
    /// Response bodies dropped before they finished
    disconnects: AtomicU32,
}

impl MockLlm {
    /// Start the mock server with replies served in order
    ///
    /// Once the script runs out, every request gets a short greeting.
    pub async fn start(replies: Vec<MockReply>) -> anyhow::Result<Self> {
        let state = Arc::new(MockLlmState {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            disconnects: AtomicU32::new(0),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_chat_completions))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL including `/v1`
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Wait until a streaming response was abandoned by the client
    pub async fn wait_for_disconnect(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.state.disconnects.load(Ordering::SeqCst) > 0 {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }
}

impl Drop for MockLlm {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// -- Chunk builders --

/// Chunk carrying a text delta
pub fn text_chunk(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion.chunk",
        "model": "mock-model-1",
        "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
    })
}

/// Chunk carrying one tool call fragment
pub fn tool_chunk(index: u32, id: Option<&str>, name: Option<&str>, arguments: &str) -> serde_json::Value {
    let mut call = serde_json::json!({
        "index": index,
        "function": {"arguments": arguments}
    });
    if let Some(id) = id {
        call["id"] = id.into();
        call["type"] = "function".into();
    }
    if let Some(name) = name {
        call["function"]["name"] = name.into();
    }

    serde_json::json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion.chunk",
        "model": "mock-model-1",
        "choices": [{"index": 0, "delta": {"tool_calls": [call]}, "finish_reason": null}]
    })
}

/// Chunk with no choices, as sent for usage reports
pub fn usage_chunk() -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion.chunk",
        "model": "mock-model-1",
        "choices": [],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

// -- Handler --

async fn handle_chat_completions(
    State(state): State<Arc<MockLlmState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    state.requests.lock().unwrap().push(ReceivedRequest {
        body,
        headers,
        at: Instant::now(),
    });

    let reply = state
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| MockReply::Stream(vec![text_chunk("Hello from mock LLM")]));

    match reply {
        MockReply::Error(status, message) => (
            status,
            Json(serde_json::json!({
                "error": {"message": message, "type": "invalid_request_error"}
            })),
        )
            .into_response(),
        MockReply::Stream(chunks) => {
            let mut body: String = chunks.iter().map(sse_frame).collect();
            body.push_str("data: [DONE]\n\n");
            ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
        }
        MockReply::Slow(chunks, gap) => {
            let frames: Vec<String> = chunks
                .iter()
                .map(sse_frame)
                .chain(std::iter::once("data: [DONE]\n\n".to_owned()))
                .collect();
            let stream = futures_util::stream::iter(frames).then(move |frame| async move {
                tokio::time::sleep(gap).await;
                Ok::<_, Infallible>(frame)
            });

            ([(header::CONTENT_TYPE, "text/event-stream")], Body::from_stream(stream)).into_response()
        }
        MockReply::Hang(chunks) => {
            let frames: Vec<String> = chunks.iter().map(sse_frame).collect();
            let guard = DisconnectGuard(Arc::clone(&state));

            // Keep-alive comments make the server notice a closed connection
            let keep_alive = futures_util::stream::unfold((), |()| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Some((": keep-alive\n\n".to_owned(), ()))
            });
            let stream = futures_util::stream::iter(frames).chain(keep_alive).map(move |frame| {
                let _alive = &guard;
                Ok::<_, Infallible>(frame)
            });

            ([(header::CONTENT_TYPE, "text/event-stream")], Body::from_stream(stream)).into_response()
        }
    }
}

fn sse_frame(chunk: &serde_json::Value) -> String {
    format!("data: {chunk}\n\n")
}

struct DisconnectGuard(Arc<MockLlmState>);

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        self.0.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}
