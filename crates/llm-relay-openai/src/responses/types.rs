//! Responses API wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Input items ────────────────────────────────────────────────────

/// An item appended to the `input` array on continuation.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum InputItem {
    Message {
        role: &'static str,
        content: String,
    },
    Typed(TypedItem),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum TypedItem {
    FunctionCall {
        call_id: String,
        name: String,
        /// JSON string of the arguments.
        arguments: String,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
}

/// A function tool in the request's `tools` array. Responses tools are
/// flat, without the chat `function` wrapper.
#[derive(Debug, Serialize)]
pub(crate) struct FunctionTool<'a> {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub name: &'a str,
    pub description: &'a str,
    pub parameters: &'a Value,
}

// ── Streaming types ────────────────────────────────────────────────

/// One streamed event. Fields are populated per `type`.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub item_id: Option<String>,
    pub delta: Option<String>,
    pub item: Option<OutputItem>,
    pub response: Option<ResponseBody>,
    /// Top-level `error` events.
    pub code: Option<String>,
    pub message: Option<String>,
}

/// An entry of the response's `output` array.
#[derive(Debug, Deserialize)]
pub(crate) struct OutputItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub id: Option<String>,
    pub call_id: Option<String>,
    pub name: Option<String>,
}

/// The response object carried by lifecycle events.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseBody {
    pub usage: Option<ResponseUsage>,
    pub incomplete_details: Option<IncompleteDetails>,
    pub error: Option<ResponseError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IncompleteDetails {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseError {
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    pub input_tokens_details: Option<InputTokensDetails>,
    pub output_tokens_details: Option<OutputTokensDetails>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InputTokensDetails {
    pub cached_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OutputTokensDetails {
    pub reasoning_tokens: Option<u64>,
}
