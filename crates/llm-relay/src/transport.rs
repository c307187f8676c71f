//! Streaming HTTP transport.
//!
//! Sessions never talk to `reqwest` directly. They hand an
//! [`HttpRequest`] to a [`Transport`] and read the body back as a
//! [`ByteStream`] of raw chunks, which keeps the state machine testable
//! against [`MockTransport`](crate::mock::MockTransport).

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures::{Stream, StreamExt};
use http::HeaderMap;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::LlmError;

/// A pinned, boxed, `Send` stream of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, LlmError>> + Send>>;

/// A JSON POST whose response body is streamed.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Target URL.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// JSON body.
    pub body: Value,
    /// Overrides the transport's whole-request timeout.
    pub timeout: Option<Duration>,
}

/// Sends a request and yields the response body incrementally.
///
/// Object-safe (boxed futures) so coordinators hold `Arc<dyn Transport>`.
pub trait Transport: Send + Sync + fmt::Debug {
    /// POSTs `request`.
    ///
    /// Resolves once response headers arrive. A non-success status is an
    /// error, with the vendor's message extracted from the body.
    fn post<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ByteStream, LlmError>> + Send + 'a>>;
}

/// Configuration for [`HttpTransport`].
#[derive(Clone, Default)]
pub struct HttpTransportConfig {
    /// Whole-request timeout. `None` uses reqwest's default (none).
    pub timeout: Option<Duration>,
    /// Connection-establishment timeout.
    pub connect_timeout: Option<Duration>,
    /// Pre-configured HTTP client for connection pooling. When `None`,
    /// a new client is built from the timeouts above.
    pub client: Option<reqwest::Client>,
}

impl fmt::Debug for HttpTransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransportConfig")
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("client", &self.client.as_ref().map(|_| "..."))
            .finish()
    }
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl HttpTransport {
    /// Builds a transport from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidRequest`] if the HTTP client cannot be
    /// constructed (e.g. TLS backend initialization failed).
    pub fn new(config: HttpTransportConfig) -> Result<Self, LlmError> {
        let client = match config.client {
            Some(client) => client,
            None => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = config.timeout {
                    builder = builder.timeout(timeout);
                }
                if let Some(connect_timeout) = config.connect_timeout {
                    builder = builder.connect_timeout(connect_timeout);
                }
                builder.build().map_err(|e| {
                    LlmError::InvalidRequest(format!("failed to build HTTP client: {e}"))
                })?
            }
        };
        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    fn elapsed_ms(&self, request: &HttpRequest) -> u64 {
        request
            .timeout
            .or(self.timeout)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    fn map_send_error(&self, request: &HttpRequest, e: &reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout {
                elapsed_ms: self.elapsed_ms(request),
            }
        } else {
            LlmError::Http {
                status: e.status(),
                message: e.to_string(),
                retryable: e.is_connect() || e.is_timeout(),
            }
        }
    }

    #[instrument(skip_all, fields(url = %request.url))]
    async fn send(&self, request: &HttpRequest) -> Result<ByteStream, LlmError> {
        let mut builder = self
            .client
            .post(&request.url)
            .headers(request.headers.clone())
            .json(&request.body);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| self.map_send_error(request, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%status, "request rejected");
            return Err(LlmError::from_status(status, &body));
        }

        let timeout_ms = self.elapsed_ms(request);
        let stream = response.bytes_stream().map(move |chunk| match chunk {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(e) if e.is_timeout() => Err(LlmError::Timeout {
                elapsed_ms: timeout_ms,
            }),
            Err(e) => Err(LlmError::Http {
                status: None,
                message: format!("Stream read error: {e}"),
                retryable: true,
            }),
        });
        Ok(Box::pin(stream))
    }
}

impl Transport for HttpTransport {
    fn post<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ByteStream, LlmError>> + Send + 'a>> {
        Box::pin(self.send(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(timeout: Option<Duration>) -> HttpRequest {
        HttpRequest {
            url: "http://localhost/v1/stream".into(),
            headers: HeaderMap::new(),
            body: Value::Null,
            timeout,
        }
    }

    #[test]
    fn test_new_with_defaults() {
        let transport = HttpTransport::new(HttpTransportConfig::default()).unwrap();
        assert_eq!(transport.elapsed_ms(&request(None)), 0);
    }

    #[test]
    fn test_new_reuses_client() {
        let config = HttpTransportConfig {
            timeout: Some(Duration::from_secs(30)),
            client: Some(reqwest::Client::new()),
            ..Default::default()
        };
        let transport = HttpTransport::new(config).unwrap();
        assert_eq!(transport.elapsed_ms(&request(None)), 30_000);
    }

    #[test]
    fn test_request_timeout_overrides_transport() {
        let config = HttpTransportConfig {
            timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        let transport = HttpTransport::new(config).unwrap();
        assert_eq!(
            transport.elapsed_ms(&request(Some(Duration::from_secs(5)))),
            5_000
        );
    }

    #[test]
    fn test_config_debug_hides_client() {
        let config = HttpTransportConfig {
            client: Some(reqwest::Client::new()),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("\"...\""));
    }

    #[test]
    fn test_transport_is_object_safe() {
        let transport: std::sync::Arc<dyn Transport> =
            std::sync::Arc::new(HttpTransport::new(HttpTransportConfig::default()).unwrap());
        assert!(format!("{transport:?}").contains("HttpTransport"));
    }
}
