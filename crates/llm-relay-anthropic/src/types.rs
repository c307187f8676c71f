//! Anthropic Messages API wire types.
//!
//! Not part of the public API; conversion from `llm-relay` types happens
//! in [`convert`](crate::convert) and [`stream`](crate::stream).

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── History types ──────────────────────────────────────────────────

/// A single message in the request history.
#[derive(Debug, Serialize)]
pub(crate) struct Message {
    pub role: &'static str,
    pub content: Vec<ContentBlock>,
}

/// A content block within a history message.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    RedactedThinking {
        data: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

/// A tool offered in the request's `tools` array.
#[derive(Debug, Serialize)]
pub(crate) struct Tool<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub input_schema: &'a Value,
}

// ── Streaming types ────────────────────────────────────────────────

/// Token usage, as found in `message_start` and `message_delta`.
///
/// Field names match the API exactly.
#[derive(Debug, Default, Deserialize)]
#[allow(clippy::struct_field_names)]
pub(crate) struct ResponseUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: Option<u64>,
    #[serde(default)]
    pub cache_read_input_tokens: Option<u64>,
}

/// A single SSE `data:` payload.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamResponse {
    #[serde(rename = "type")]
    pub event_type: String,
    /// Content block index (for `content_block_*` events).
    pub index: Option<u32>,
    /// Content block (for `content_block_start`).
    pub content_block: Option<StreamContentBlock>,
    /// Delta (for `content_block_delta` and `message_delta`).
    pub delta: Option<StreamDelta>,
    /// Message envelope (for `message_start`).
    pub message: Option<StreamMessage>,
    /// Usage (for `message_delta`).
    pub usage: Option<ResponseUsage>,
    /// Error detail (for `error`).
    pub error: Option<StreamError>,
}

/// Content block within a `content_block_start` event.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub thinking: Option<String>,
    pub signature: Option<String>,
    pub data: Option<String>,
}

/// Delta content within streaming events.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamDelta {
    #[serde(rename = "type")]
    pub delta_type: Option<String>,
    pub text: Option<String>,
    pub thinking: Option<String>,
    pub signature: Option<String>,
    pub partial_json: Option<String>,
    pub stop_reason: Option<String>,
}

/// Message envelope from `message_start`.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamMessage {
    pub usage: Option<ResponseUsage>,
}

/// In-band error (`{"type":"error","error":{...}}`).
#[derive(Debug, Deserialize)]
pub(crate) struct StreamError {
    #[serde(rename = "type", default)]
    pub error_type: String,
    #[serde(default)]
    pub message: String,
}
