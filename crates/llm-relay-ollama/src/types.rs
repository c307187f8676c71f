//! Ollama Chat API wire types.
//!
//! These mirror Ollama's wire format and are not part of the public API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Outgoing history types ─────────────────────────────────────────

/// A message appended to the payload's `messages` array.
#[derive(Debug, Serialize)]
pub(crate) struct Message {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

/// Tool call in an assistant message (outgoing).
#[derive(Debug, Serialize)]
pub(crate) struct ToolCallRequest {
    pub function: FunctionCallRequest,
}

/// Function call details for outgoing messages. Ollama takes the
/// arguments as an object, not a string.
#[derive(Debug, Serialize)]
pub(crate) struct FunctionCallRequest {
    pub name: String,
    pub arguments: Value,
}

/// Tool definition in the request's `tools` array.
#[derive(Debug, Serialize)]
pub(crate) struct Tool<'a> {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub function: ToolFunction<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ToolFunction<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub parameters: &'a Value,
}

// ── Streaming types ────────────────────────────────────────────────

/// A single JSON line from the streaming API.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamChunk {
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub done: bool,
    /// Reason the generation stopped (e.g. `"stop"`, `"length"`).
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Message within a chunk.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub thinking: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallResponse>,
}

/// Tool call in a chunk. Ollama sends each call whole.
#[derive(Debug, Deserialize)]
pub(crate) struct ToolCallResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub function: FunctionCallResponse,
}

/// Function call details in a chunk.
#[derive(Debug, Deserialize)]
pub(crate) struct FunctionCallResponse {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}
