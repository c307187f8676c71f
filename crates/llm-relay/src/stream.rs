//! Normalized streaming events.
//!
//! Every vendor parser turns one framed line into zero or more
//! [`StreamEvent`]s. The [`Message`](crate::message::Message) builder
//! consumes them without knowing which vendor produced them.
//!
//! # Tool-call reassembly
//!
//! Tool calls arrive in three phases:
//! 1. [`ToolCallStart`](StreamEvent::ToolCallStart) announces the call's
//!    `id` and `name`, plus an optional [`ToolKey`] alias (stream index
//!    or output-item id) used by later fragments.
//! 2. [`ToolCallArgsDelta`](StreamEvent::ToolCallArgsDelta) carries raw
//!    JSON fragments, possibly one character at a time.
//! 3. [`ToolCallDone`](StreamEvent::ToolCallDone) closes the call; the
//!    builder parses the accumulated arguments then. Calls still open
//!    when the round finishes are closed implicitly.

use serde::{Deserialize, Serialize};

use crate::usage::Usage;

/// How a tool-call fragment refers to its call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKey {
    /// The vendor-assigned call id itself.
    Id(String),
    /// Position of the call within the streamed choice or message.
    Index(u32),
    /// An output-item id distinct from the call id.
    Item(String),
}

/// Normalized reason a round stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of output.
    Stop,
    /// Output was truncated by a token limit.
    Length,
    /// The model is waiting for tool results.
    ToolCalls,
    /// The vendor ended the round on a policy or generation failure.
    /// Carries a human-readable explanation.
    ErrorLike(String),
    /// A code this crate does not recognize.
    Unknown,
}

/// Why a line produced no content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// An empty payload.
    Blank,
    /// An SSE comment or keepalive (`: ...`).
    Comment,
    /// A framing sentinel such as `[DONE]`.
    Sentinel,
    /// A non-`data` SSE field (`event:`, `id:`, `retry:`).
    Field(String),
    /// A payload that failed to parse.
    Malformed(String),
    /// A well-formed event this crate has no use for (pings, stops).
    Unhandled(String),
}

/// An incremental event emitted while a response streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum StreamEvent {
    /// A fragment of visible text.
    TextDelta(String),
    /// A fragment of reasoning text.
    ThinkingDelta(String),
    /// An opaque signature authenticating the current reasoning block.
    ThinkingSignature(String),
    /// A complete encrypted reasoning block.
    RedactedThinking(String),
    /// A new tool call.
    ToolCallStart {
        /// Vendor-assigned call id, echoed back with the result.
        id: String,
        /// The tool's registered name.
        name: String,
        /// Alias used by later fragments of this call, if not the id.
        key: Option<ToolKey>,
    },
    /// A raw fragment of a call's JSON arguments.
    ToolCallArgsDelta {
        /// Which call the fragment belongs to.
        key: ToolKey,
        /// The fragment, verbatim.
        fragment: String,
    },
    /// A call's arguments are complete.
    ToolCallDone {
        /// Which call finished.
        key: ToolKey,
    },
    /// The round ended.
    Finish {
        /// Normalized reason.
        reason: FinishReason,
        /// The vendor's raw code, for diagnostics.
        raw: String,
        /// `true` when the code ends the conversation, not just the turn.
        conversation_over: bool,
    },
    /// A token usage snapshot.
    Usage(Usage),
    /// The vendor reported an error in-band.
    Error {
        /// Vendor error code or type.
        code: String,
        /// Human-readable description.
        message: String,
    },
    /// The line carried nothing to act on.
    Ignored(IgnoreReason),
}

impl StreamEvent {
    /// A finish event that ends the turn.
    pub fn finish(reason: FinishReason, raw: impl Into<String>) -> Self {
        Self::Finish {
            reason,
            raw: raw.into(),
            conversation_over: false,
        }
    }

    /// A finish event that ends the conversation.
    pub fn finish_final(reason: FinishReason, raw: impl Into<String>) -> Self {
        Self::Finish {
            reason,
            raw: raw.into(),
            conversation_over: true,
        }
    }

    /// An ignorable event for a payload that failed to parse.
    pub fn malformed(err: impl std::fmt::Display) -> Self {
        Self::Ignored(IgnoreReason::Malformed(err.to_string()))
    }

    /// An ignorable event for a recognized but unused event type.
    pub fn unhandled(kind: impl Into<String>) -> Self {
        Self::Ignored(IgnoreReason::Unhandled(kind.into()))
    }
}

/// Extracts the payload of an SSE `data:` line.
///
/// Everything else maps to the [`IgnoreReason`] a parser should report
/// for it, so SSE parsers can open with:
///
/// ```rust
/// use llm_relay::stream::{sse_payload, StreamEvent};
///
/// fn parse_line(line: &str) -> Vec<StreamEvent> {
///     let data = match sse_payload(line) {
///         Ok(data) => data,
///         Err(reason) => return vec![StreamEvent::Ignored(reason)],
///     };
///     vec![StreamEvent::TextDelta(data.to_string())]
/// }
///
/// assert_eq!(parse_line("data: hi"), vec![StreamEvent::TextDelta("hi".into())]);
/// ```
pub fn sse_payload(line: &str) -> Result<&str, IgnoreReason> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return Err(IgnoreReason::Blank);
    }
    if line.starts_with(':') {
        return Err(IgnoreReason::Comment);
    }
    let Some(data) = line.strip_prefix("data:") else {
        let field = line.split(':').next().unwrap_or_default();
        return Err(IgnoreReason::Field(field.to_string()));
    };
    let data = data.strip_prefix(' ').unwrap_or(data);
    if data == "[DONE]" {
        return Err(IgnoreReason::Sentinel);
    }
    if data.trim().is_empty() {
        return Err(IgnoreReason::Blank);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_payload_data() {
        assert_eq!(sse_payload(r#"data: {"a":1}"#), Ok(r#"{"a":1}"#));
        assert_eq!(sse_payload(r#"data:{"a":1}"#), Ok(r#"{"a":1}"#));
        assert_eq!(sse_payload("data: x\r"), Ok("x"));
    }

    #[test]
    fn test_sse_payload_ignorables() {
        assert_eq!(sse_payload("data: [DONE]"), Err(IgnoreReason::Sentinel));
        assert_eq!(sse_payload(": OPENROUTER PROCESSING"), Err(IgnoreReason::Comment));
        assert_eq!(
            sse_payload("event: message_start"),
            Err(IgnoreReason::Field("event".into()))
        );
        assert_eq!(sse_payload("   "), Err(IgnoreReason::Blank));
        assert_eq!(sse_payload("data: "), Err(IgnoreReason::Blank));
    }

    #[test]
    fn test_stream_event_serde_shape() {
        let event: StreamEvent = serde_json::from_str(r#"{"text_delta":"Hi"}"#).unwrap();
        assert_eq!(event, StreamEvent::TextDelta("Hi".into()));

        let event: StreamEvent = serde_json::from_str(
            r#"{"tool_call_start":{"id":"t1","name":"search","key":{"index":0}}}"#,
        )
        .unwrap();
        assert!(matches!(
            event,
            StreamEvent::ToolCallStart { ref id, key: Some(ToolKey::Index(0)), .. } if id == "t1"
        ));

        let event: StreamEvent = serde_json::from_str(
            r#"{"finish":{"reason":{"error_like":"blocked"},"raw":"SAFETY","conversation_over":false}}"#,
        )
        .unwrap();
        assert!(matches!(
            event,
            StreamEvent::Finish { reason: FinishReason::ErrorLike(ref m), .. } if m == "blocked"
        ));
    }

    #[test]
    fn test_finish_constructors() {
        assert!(matches!(
            StreamEvent::finish_final(FinishReason::Stop, "end_turn"),
            StreamEvent::Finish { conversation_over: true, .. }
        ));
        assert!(matches!(
            StreamEvent::finish(FinishReason::Length, "max_tokens"),
            StreamEvent::Finish { reason: FinishReason::Length, conversation_over: false, .. }
        ));
    }
}
