//! Scripted transport for exercising the client without a network

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures_util::Stream;
use tokio::time::Instant;

use super::{ChunkStream, Transport};
use crate::error::TransportError;
use crate::types::{CompletionRequest, ResponseChunk};

/// Outcome of one `open_stream` call
pub enum Script {
    /// Fail to open
    Fail(TransportError),
    /// Open a stream yielding these items, then end
    Stream(Vec<Result<ResponseChunk, TransportError>>),
    /// Open a stream yielding these items, then never end
    Hang(Vec<Result<ResponseChunk, TransportError>>),
    /// Like `Stream`, but closing reports an error
    FailingClose(Vec<Result<ResponseChunk, TransportError>>),
}

#[derive(Default)]
struct Recorder {
    requests: Mutex<Vec<CompletionRequest>>,
    opened_at: Mutex<Vec<Instant>>,
    closes: AtomicUsize,
}

pub struct ScriptedTransport {
    endpoint: String,
    scripts: Mutex<VecDeque<Script>>,
    recorder: Arc<Recorder>,
}

impl ScriptedTransport {
    pub fn new(endpoint: &str, scripts: Vec<Script>) -> Self {
        Self {
            endpoint: endpoint.to_owned(),
            scripts: Mutex::new(scripts.into()),
            recorder: Arc::new(Recorder::default()),
        }
    }

    /// Requests received, including failed attempts
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.recorder.requests.lock().unwrap().clone()
    }

    /// When each request was received
    pub fn opened_at(&self) -> Vec<Instant> {
        self.recorder.opened_at.lock().unwrap().clone()
    }

    /// Total `close` calls across all streams
    pub fn closes(&self) -> usize {
        self.recorder.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn open_stream(&self, request: &CompletionRequest) -> Result<Box<dyn ChunkStream>, TransportError> {
        self.recorder.requests.lock().unwrap().push(request.clone());
        self.recorder.opened_at.lock().unwrap().push(Instant::now());

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Script::Stream(Vec::new()));

        let (items, hang, fail_close) = match script {
            Script::Fail(error) => return Err(error),
            Script::Stream(items) => (items, false, false),
            Script::Hang(items) => (items, true, false),
            Script::FailingClose(items) => (items, false, true),
        };

        Ok(Box::new(ScriptedStream {
            items: items.into(),
            hang,
            fail_close,
            closed: false,
            recorder: Arc::clone(&self.recorder),
        }))
    }
}

struct ScriptedStream {
    items: VecDeque<Result<ResponseChunk, TransportError>>,
    hang: bool,
    fail_close: bool,
    closed: bool,
    recorder: Arc<Recorder>,
}

impl Stream for ScriptedStream {
    type Item = Result<ResponseChunk, TransportError>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.closed {
            return Poll::Ready(None);
        }
        match self.items.pop_front() {
            Some(item) => Poll::Ready(Some(item)),
            None if self.hang => Poll::Pending,
            None => Poll::Ready(None),
        }
    }
}

impl ChunkStream for ScriptedStream {
    fn close(&mut self) -> Result<(), TransportError> {
        self.recorder.closes.fetch_add(1, Ordering::SeqCst);
        self.closed = true;
        if self.fail_close {
            return Err(TransportError::Cleanup("connection already reset".to_owned()));
        }
        Ok(())
    }
}
