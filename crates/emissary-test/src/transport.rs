//! In-memory transports.
//!
//! [`MockTransport`] and [`MockAsyncTransport`] stand in for the HTTP engine:
//! they record every [`TransportRequest`] and answer from a handler, a fixed
//! response or a queue, without opening a socket.

use crate::response::MockResponse;
use async_trait::async_trait;
use emissary_client::{join_url, AsyncTransport, Response, Transport};
use emissary_core::{EmissaryError, Result, TransportRequest};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Handler answering a recorded request.
pub type MockHandler = Arc<dyn Fn(&TransportRequest) -> MockResponse + Send + Sync>;

enum Responder {
    Handler(MockHandler),
    Queue(Mutex<VecDeque<MockResponse>>),
}

/// Shared recording state of both mock flavours.
struct Recorder {
    base_url: String,
    responder: Responder,
    requests: Mutex<Vec<TransportRequest>>,
}

impl Recorder {
    fn new(base_url: impl Into<String>, responder: Responder) -> Self {
        Self {
            base_url: base_url.into(),
            responder,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn respond(&self, request: &TransportRequest) -> Result<Response> {
        self.requests.lock().push(request.clone());
        let template = match &self.responder {
            Responder::Handler(handler) => handler(request),
            Responder::Queue(queue) => queue.lock().pop_front().ok_or_else(|| {
                EmissaryError::transport(format!(
                    "no queued response left for {} {}",
                    request.method, request.url
                ))
            })?,
        };
        Ok(template.into_response(join_url(&self.base_url, &request.url)))
    }

    fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    fn last_request(&self) -> Option<TransportRequest> {
        self.requests.lock().last().cloned()
    }

    fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn push_response(&self, response: MockResponse) {
        if let Responder::Queue(queue) = &self.responder {
            queue.lock().push_back(response);
        }
    }
}

fn echo_handler() -> MockHandler {
    Arc::new(|request: &TransportRequest| MockResponse::json(request))
}

fn fixed_handler(response: MockResponse) -> MockHandler {
    Arc::new(move |_: &TransportRequest| response.clone())
}

/// A blocking in-memory transport.
///
/// # Example
///
/// ```
/// use emissary_client::Transport;
/// use emissary_core::{Args, HttpMethod};
/// use emissary_test::{MockResponse, MockTransport};
/// use serde_json::json;
///
/// let mock = MockTransport::fixed("https://api.test", MockResponse::json(&json!({"ok": true})));
/// let request = Args::new("/ping").into_request(HttpMethod::Get).unwrap();
///
/// let response = mock.request(&request).unwrap();
/// assert_eq!(response.json().unwrap()["ok"], true);
/// assert_eq!(mock.request_count(), 1);
/// ```
#[must_use]
pub struct MockTransport {
    recorder: Recorder,
}

impl MockTransport {
    /// Creates a transport answering through `handler`.
    pub fn new<F>(base_url: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&TransportRequest) -> MockResponse + Send + Sync + 'static,
    {
        Self {
            recorder: Recorder::new(base_url, Responder::Handler(Arc::new(handler))),
        }
    }

    /// Creates a transport that always answers with `response`.
    pub fn fixed(base_url: impl Into<String>, response: MockResponse) -> Self {
        Self {
            recorder: Recorder::new(base_url, Responder::Handler(fixed_handler(response))),
        }
    }

    /// Creates a transport answering with the serialized request itself.
    pub fn echo(base_url: impl Into<String>) -> Self {
        Self {
            recorder: Recorder::new(base_url, Responder::Handler(echo_handler())),
        }
    }

    /// Creates a transport that pops one response per request. An exhausted
    /// queue answers with a transport error.
    pub fn queue(
        base_url: impl Into<String>,
        responses: impl IntoIterator<Item = MockResponse>,
    ) -> Self {
        Self {
            recorder: Recorder::new(
                base_url,
                Responder::Queue(Mutex::new(responses.into_iter().collect())),
            ),
        }
    }

    /// Appends a response to a queue transport. No-op for handler transports.
    pub fn push_response(&self, response: MockResponse) {
        self.recorder.push_response(response);
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.recorder.requests()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<TransportRequest> {
        self.recorder.last_request()
    }

    /// Number of requests received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.recorder.request_count()
    }
}

impl Transport for MockTransport {
    fn base_url(&self) -> &str {
        &self.recorder.base_url
    }

    fn request(&self, request: &TransportRequest) -> Result<Response> {
        self.recorder.respond(request)
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("base_url", &self.recorder.base_url)
            .field("requests", &self.recorder.request_count())
            .finish()
    }
}

/// An async in-memory transport.
///
/// Same constructors as [`MockTransport`], plus an optional artificial
/// latency applied before each answer.
#[must_use]
pub struct MockAsyncTransport {
    recorder: Recorder,
    latency: Option<Duration>,
}

impl MockAsyncTransport {
    fn from_recorder(recorder: Recorder) -> Self {
        Self {
            recorder,
            latency: None,
        }
    }

    /// Creates a transport answering through `handler`.
    pub fn new<F>(base_url: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&TransportRequest) -> MockResponse + Send + Sync + 'static,
    {
        Self::from_recorder(Recorder::new(
            base_url,
            Responder::Handler(Arc::new(handler)),
        ))
    }

    /// Creates a transport that always answers with `response`.
    pub fn fixed(base_url: impl Into<String>, response: MockResponse) -> Self {
        Self::from_recorder(Recorder::new(
            base_url,
            Responder::Handler(fixed_handler(response)),
        ))
    }

    /// Creates a transport answering with the serialized request itself.
    pub fn echo(base_url: impl Into<String>) -> Self {
        Self::from_recorder(Recorder::new(base_url, Responder::Handler(echo_handler())))
    }

    /// Creates a transport that pops one response per request.
    pub fn queue(
        base_url: impl Into<String>,
        responses: impl IntoIterator<Item = MockResponse>,
    ) -> Self {
        Self::from_recorder(Recorder::new(
            base_url,
            Responder::Queue(Mutex::new(responses.into_iter().collect())),
        ))
    }

    /// Sleeps for `latency` before answering each request.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Appends a response to a queue transport. No-op for handler transports.
    pub fn push_response(&self, response: MockResponse) {
        self.recorder.push_response(response);
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.recorder.requests()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<TransportRequest> {
        self.recorder.last_request()
    }

    /// Number of requests received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.recorder.request_count()
    }
}

#[async_trait]
impl AsyncTransport for MockAsyncTransport {
    fn base_url(&self) -> &str {
        &self.recorder.base_url
    }

    async fn request(&self, request: &TransportRequest) -> Result<Response> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.recorder.respond(request)
    }
}

impl fmt::Debug for MockAsyncTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockAsyncTransport")
            .field("base_url", &self.recorder.base_url)
            .field("requests", &self.recorder.request_count())
            .field("latency", &self.latency)
            .finish()
    }
}
