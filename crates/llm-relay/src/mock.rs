//! Mock transport for testing.
//!
//! [`MockTransport`] is a queue-based fake [`Transport`]. Each `post`
//! pops the next scripted response: a body delivered in caller-chosen
//! chunks, an error, or a connection that never finishes. Every request
//! is recorded for later assertions.
//!
//! ```rust,no_run
//! use llm_relay::mock::MockTransport;
//!
//! let transport = MockTransport::new();
//! transport.queue_body("data: {\"text\":\"hi\"}\n\n");
//! transport.queue_split("data: [DONE]\n\n", 3);
//! ```
//!
//! # Why `MockError` instead of `LlmError`?
//!
//! [`LlmError`] is not `Clone`, so it can't be stored in a queue.
//! [`MockError`] mirrors the common variants in a cloneable form and
//! converts at dequeue time.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::{StreamExt, stream};

use crate::error::LlmError;
use crate::transport::{ByteStream, HttpRequest, Transport};

/// Cloneable error subset for mock queuing.
#[derive(Debug, Clone)]
pub enum MockError {
    /// Maps to [`LlmError::Http`].
    Http {
        /// HTTP status code, if any.
        status: Option<http::StatusCode>,
        /// Error message.
        message: String,
        /// Whether the error is retryable.
        retryable: bool,
    },
    /// Maps to [`LlmError::Auth`].
    Auth(String),
    /// Maps to [`LlmError::Provider`].
    Provider {
        /// Provider error code.
        code: String,
        /// Error message.
        message: String,
        /// Whether the error is retryable.
        retryable: bool,
    },
    /// Maps to [`LlmError::Timeout`].
    Timeout {
        /// Elapsed milliseconds.
        elapsed_ms: u64,
    },
}

impl MockError {
    fn into_llm_error(self) -> LlmError {
        match self {
            Self::Http {
                status,
                message,
                retryable,
            } => LlmError::Http {
                status,
                message,
                retryable,
            },
            Self::Auth(msg) => LlmError::Auth(msg),
            Self::Provider {
                code,
                message,
                retryable,
            } => LlmError::Provider {
                code,
                message,
                retryable,
            },
            Self::Timeout { elapsed_ms } => LlmError::Timeout { elapsed_ms },
        }
    }
}

#[derive(Debug, Clone)]
enum MockResponse {
    Body(Vec<Vec<u8>>),
    BodyThenError(Vec<Vec<u8>>, MockError),
    BodyThenStall(Vec<Vec<u8>>),
    Error(MockError),
    Stall,
}

/// A queue-based fake transport.
///
/// An empty queue answers with [`LlmError::InvalidRequest`].
pub struct MockTransport {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("queued_responses", &lock(&self.responses).len())
            .field("recorded_requests", &lock(&self.requests).len())
            .finish()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn split(body: &[u8], chunk_size: usize) -> Vec<Vec<u8>> {
    body.chunks(chunk_size.max(1)).map(<[u8]>::to_vec).collect()
}

impl MockTransport {
    /// Creates a transport with an empty queue.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn push(&self, response: MockResponse) -> &Self {
        lock(&self.responses).push_back(response);
        self
    }

    /// Queues a body delivered as a single chunk.
    pub fn queue_body(&self, body: impl Into<Vec<u8>>) -> &Self {
        self.push(MockResponse::Body(vec![body.into()]))
    }

    /// Queues a body delivered in `chunk_size`-byte pieces.
    pub fn queue_split(&self, body: impl AsRef<[u8]>, chunk_size: usize) -> &Self {
        self.push(MockResponse::Body(split(body.as_ref(), chunk_size)))
    }

    /// Queues a body delivered as exactly these chunks.
    pub fn queue_chunks(&self, chunks: Vec<Vec<u8>>) -> &Self {
        self.push(MockResponse::Body(chunks))
    }

    /// Queues a body that breaks with `error` after `body` was delivered.
    pub fn queue_body_then_error(&self, body: impl Into<Vec<u8>>, error: MockError) -> &Self {
        self.push(MockResponse::BodyThenError(vec![body.into()], error))
    }

    /// Queues a body that stops producing data after `body`, never closing.
    pub fn queue_body_then_stall(&self, body: impl Into<Vec<u8>>) -> &Self {
        self.push(MockResponse::BodyThenStall(vec![body.into()]))
    }

    /// Queues a request-level error (connection failure, bad status).
    pub fn queue_error(&self, error: MockError) -> &Self {
        self.push(MockResponse::Error(error))
    }

    /// Queues a request whose response headers never arrive.
    pub fn queue_stall(&self) -> &Self {
        self.push(MockResponse::Stall)
    }

    /// Every request posted so far, in order.
    pub fn recorded_requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    /// Number of scripted responses not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }
}

impl Transport for MockTransport {
    fn post<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ByteStream, LlmError>> + Send + 'a>> {
        lock(&self.requests).push(request.clone());
        let next = lock(&self.responses).pop_front();

        Box::pin(async move {
            let Some(response) = next else {
                return Err(LlmError::InvalidRequest(
                    "MockTransport: no queued response".into(),
                ));
            };
            let body: ByteStream = match response {
                MockResponse::Body(chunks) => Box::pin(stream::iter(chunks.into_iter().map(Ok))),
                MockResponse::BodyThenError(chunks, error) => Box::pin(
                    stream::iter(chunks.into_iter().map(Ok))
                        .chain(stream::once(async move { Err(error.into_llm_error()) })),
                ),
                MockResponse::BodyThenStall(chunks) => Box::pin(
                    stream::iter(chunks.into_iter().map(Ok)).chain(stream::pending()),
                ),
                MockResponse::Error(error) => return Err(error.into_llm_error()),
                MockResponse::Stall => futures::future::pending::<ByteStream>().await,
            };
            Ok(body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> HttpRequest {
        HttpRequest {
            url: "http://mock.local".into(),
            headers: http::HeaderMap::new(),
            body: serde_json::json!({"messages": []}),
            timeout: None,
        }
    }

    async fn drain(mut body: ByteStream) -> Vec<Result<Vec<u8>, LlmError>> {
        let mut out = Vec::new();
        while let Some(chunk) = body.next().await {
            out.push(chunk);
        }
        out
    }

    #[tokio::test]
    async fn test_split_body_and_recording() {
        let transport = MockTransport::new();
        transport.queue_split("abcdefg", 3);
        let body = transport.post(&request()).await.unwrap();
        let chunks: Vec<_> = drain(body).await.into_iter().map(Result::unwrap).collect();
        assert_eq!(chunks, vec![b"abc".to_vec(), b"def".to_vec(), b"g".to_vec()]);
        assert_eq!(transport.recorded_requests().len(), 1);
        assert_eq!(transport.remaining(), 0);
    }

    #[tokio::test]
    async fn test_queued_error() {
        let transport = MockTransport::new();
        transport.queue_error(MockError::Auth("bad key".into()));
        let err = transport.post(&request()).await.err().unwrap();
        assert!(matches!(err, LlmError::Auth(_)));
    }

    #[tokio::test]
    async fn test_body_then_error() {
        let transport = MockTransport::new();
        transport.queue_body_then_error(
            "partial",
            MockError::Http {
                status: None,
                message: "reset".into(),
                retryable: true,
            },
        );
        let body = transport.post(&request()).await.unwrap();
        let chunks = drain(body).await;
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].is_err());
    }

    #[tokio::test]
    async fn test_empty_queue_is_error() {
        let transport = MockTransport::new();
        let err = transport.post(&request()).await.err().unwrap();
        assert!(matches!(err, LlmError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_stall_never_resolves() {
        let transport = MockTransport::new();
        transport.queue_stall();
        let request = request();
        let result = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            transport.post(&request),
        )
        .await;
        assert!(result.is_err());
    }
}
