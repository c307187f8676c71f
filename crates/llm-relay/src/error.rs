//! Unified error type for streaming sessions.
//!
//! Every vendor crate maps its native failures into [`LlmError`], so the
//! session coordinator and its callers match against a single type no
//! matter which backend produced the stream.
//!
//! # Retryability
//!
//! Transport-level variants carry a `retryable` flag derived from the
//! upstream status (429, 5xx). Errors the model itself signals in-band
//! (content filters, refusals, malformed tool calls) are always reported
//! with `retryable: false`:
//!
//! ```rust
//! use llm_relay::LlmError;
//!
//! fn should_retry(err: &LlmError) -> bool {
//!     match err {
//!         LlmError::Http { retryable, .. } => *retryable,
//!         LlmError::Provider { retryable, .. } => *retryable,
//!         LlmError::Timeout { .. } => true,
//!         _ => false,
//!     }
//! }
//! ```

/// The unified error type returned by transports, parsers and sessions.
///
/// Variants are `#[non_exhaustive]`; always include a wildcard arm.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LlmError {
    /// An HTTP-level failure (transport error, unexpected status code).
    ///
    /// `status` is `None` when the request never received a response
    /// (e.g. DNS failure, connection reset) or the body stream broke.
    #[error("HTTP error (status={status:?}): {message}")]
    Http {
        /// The HTTP status code, if one was received.
        status: Option<http::StatusCode>,
        /// A human-readable description of the failure.
        message: String,
        /// Whether the caller should retry this request.
        retryable: bool,
    },

    /// The API key or token was rejected.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The request was malformed, or a caller broke an API contract
    /// (e.g. reusing a live request id).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An error reported by the vendor, either as an HTTP error body or
    /// in-band in the stream.
    #[error("Provider error ({code}): {message}")]
    Provider {
        /// Vendor-defined error code (e.g. `"overloaded_error"`, `"SAFETY"`).
        code: String,
        /// Human-readable error description.
        message: String,
        /// Whether the caller should retry this request.
        retryable: bool,
    },

    /// The response body could not be framed or parsed.
    #[error("Response format error: {message}")]
    ResponseFormat {
        /// What went wrong during parsing.
        message: String,
        /// The raw response fragment, for diagnostics.
        raw: String,
    },

    /// The operation exceeded its deadline.
    #[error("Operation timed out after {elapsed_ms}ms")]
    Timeout {
        /// Milliseconds elapsed before the timeout fired.
        elapsed_ms: u64,
    },

    /// A session ran more tool rounds than its configuration allows.
    #[error("tool round limit exceeded (limit: {limit})")]
    RoundLimitExceeded {
        /// The configured maximum number of rounds.
        limit: u32,
    },

    /// The request was cancelled before it finished.
    #[error("Request cancelled")]
    Cancelled,
}

impl LlmError {
    /// Returns `true` if the error is transient and the request may succeed on retry.
    ///
    /// # Example
    ///
    /// ```rust
    /// use llm_relay::LlmError;
    ///
    /// let err = LlmError::Timeout { elapsed_ms: 5000 };
    /// assert!(err.is_retryable());
    ///
    /// let err = LlmError::Auth("bad key".into());
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { retryable, .. } | Self::Provider { retryable, .. } => *retryable,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Builds the error for a vendor-reported, in-band failure.
    ///
    /// These are never retryable: the same prompt is likely to trip the
    /// same filter again.
    pub fn provider(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            code: code.into(),
            message: message.into(),
            retryable: false,
        }
    }

    /// Maps a non-success HTTP status and its body to an error.
    ///
    /// The body is searched for the common vendor shapes
    /// (`{"error": {"message": ..}}`, `{"error": ".."}`, `{"message": ..}`)
    /// and falls back to the raw text.
    pub fn from_status(status: http::StatusCode, body: &str) -> Self {
        let message = extract_error_message(body).unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body.to_string()
            }
        });

        if status == http::StatusCode::UNAUTHORIZED || status == http::StatusCode::FORBIDDEN {
            return Self::Auth(message);
        }

        if status == http::StatusCode::BAD_REQUEST {
            return Self::InvalidRequest(message);
        }

        let retryable = matches!(status.as_u16(), 429 | 500 | 502 | 503 | 529);

        Self::Http {
            status: Some(status),
            message,
            retryable,
        }
    }
}

fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    // Google wraps a list of errors for batch endpoints
    let value = match value {
        serde_json::Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        other => other,
    };
    match value.get("error") {
        Some(serde_json::Value::String(message)) => Some(message.clone()),
        Some(error) => error
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string),
        None => value
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string),
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        Self::ResponseFormat {
            message: err.to_string(),
            raw: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_http() {
        let err = LlmError::Http {
            status: Some(http::StatusCode::TOO_MANY_REQUESTS),
            message: "rate limited".into(),
            retryable: true,
        };
        let display = format!("{err}");
        assert!(display.contains("429"));
        assert!(display.contains("rate limited"));
    }

    #[test]
    fn test_error_display_provider() {
        let err = LlmError::provider("SAFETY", "blocked by safety filters");
        let display = format!("{err}");
        assert!(display.contains("SAFETY"));
        assert!(display.contains("blocked by safety filters"));
    }

    #[test]
    fn test_error_display_round_limit() {
        let err = LlmError::RoundLimitExceeded { limit: 8 };
        assert!(format!("{err}").contains("limit: 8"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LlmError>();
    }

    #[test]
    fn test_in_band_provider_errors_not_retryable() {
        assert!(!LlmError::provider("content_filter", "filtered").is_retryable());
        assert!(!LlmError::Cancelled.is_retryable());
        assert!(LlmError::Timeout { elapsed_ms: 10 }.is_retryable());
    }

    #[test]
    fn test_from_status_auth() {
        let err = LlmError::from_status(
            http::StatusCode::UNAUTHORIZED,
            r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#,
        );
        assert!(matches!(err, LlmError::Auth(ref m) if m == "invalid x-api-key"));
    }

    #[test]
    fn test_from_status_bad_request() {
        let err = LlmError::from_status(http::StatusCode::BAD_REQUEST, r#"{"error":"model not found"}"#);
        assert!(matches!(err, LlmError::InvalidRequest(ref m) if m == "model not found"));
    }

    #[test]
    fn test_from_status_retryable() {
        let err = LlmError::from_status(http::StatusCode::SERVICE_UNAVAILABLE, "upstream down");
        assert!(err.is_retryable());
        assert!(format!("{err}").contains("upstream down"));

        let err = LlmError::from_status(http::StatusCode::NOT_FOUND, "");
        assert!(!err.is_retryable());
        assert!(format!("{err}").contains("Not Found"));
    }

    #[test]
    fn test_from_status_google_array_body() {
        let body = r#"[{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}]"#;
        let err = LlmError::from_status(http::StatusCode::TOO_MANY_REQUESTS, body);
        assert!(matches!(
            err,
            LlmError::Http { ref message, retryable: true, .. } if message == "Resource has been exhausted"
        ));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not valid json").unwrap_err();
        let llm_err: LlmError = json_err.into();
        assert!(matches!(llm_err, LlmError::ResponseFormat { .. }));
    }
}
