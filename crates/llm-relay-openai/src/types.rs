//! Chat Completions wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── History types ──────────────────────────────────────────────────

/// An assistant or tool message appended on continuation.
#[derive(Debug, Serialize)]
pub(crate) struct Message {
    pub role: &'static str,
    /// Serialized as `null` when absent; assistant turns with only tool
    /// calls still carry the key.
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Tool call in an assistant message (outgoing).
#[derive(Debug, Serialize)]
pub(crate) struct ToolCallRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: &'static str,
    pub function: FunctionCallRequest,
}

/// Function call details.
#[derive(Debug, Serialize)]
pub(crate) struct FunctionCallRequest {
    pub name: String,
    /// JSON string of the arguments.
    pub arguments: String,
}

/// Tool definition sent in the request.
#[derive(Debug, Serialize)]
pub(crate) struct Tool<'a> {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub function: FunctionDef<'a>,
}

/// Function definition within a tool.
#[derive(Debug, Serialize)]
pub(crate) struct FunctionDef<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub parameters: &'a Value,
}

// ── Streaming types ────────────────────────────────────────────────

/// A single SSE chunk from the streaming API.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    pub usage: Option<ResponseUsage>,
    pub error: Option<ErrorDetail>,
}

/// A choice within a streaming chunk.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamChoice {
    #[serde(default)]
    pub delta: StreamDelta,
    pub finish_reason: Option<String>,
}

/// Delta content within a streaming chunk.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct StreamDelta {
    pub content: Option<String>,
    /// DeepSeek, vLLM and llama.cpp.
    pub reasoning_content: Option<String>,
    /// OpenRouter.
    pub reasoning: Option<String>,
    pub tool_calls: Option<Vec<StreamToolCall>>,
}

/// Tool call delta in a streaming chunk.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamToolCall {
    #[serde(default)]
    pub index: u32,
    pub id: Option<String>,
    pub function: Option<StreamFunctionCall>,
}

/// Function call delta in a streaming chunk.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamFunctionCall {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// Token usage, sent on the last chunk when `stream_options.include_usage`
/// is set.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub prompt_tokens_details: Option<PromptTokensDetails>,
    #[serde(default)]
    pub completion_tokens_details: Option<CompletionTokensDetails>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PromptTokensDetails {
    #[serde(default)]
    pub cached_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionTokensDetails {
    #[serde(default)]
    pub reasoning_tokens: Option<u64>,
}

/// An error object embedded in the stream.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    /// A string for `OpenAI`, a number for some compatible servers.
    #[serde(default)]
    pub code: Option<Value>,
}

impl ErrorDetail {
    pub(crate) fn code(&self) -> String {
        match &self.code {
            Some(Value::String(code)) => code.clone(),
            Some(Value::Number(code)) => code.to_string(),
            _ => self.error_type.clone().unwrap_or_else(|| "error".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_stream_chunk_deserialization() {
        let chunk: StreamChunk = serde_json::from_str(
            r#"{"id":"chatcmpl-1","object":"chat.completion.chunk","choices":[{"index":0,"delta":{"role":"assistant","content":"Hi"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hi"));
        assert!(chunk.usage.is_none());
        assert!(chunk.error.is_none());
    }

    #[test]
    fn test_usage_only_chunk() {
        let chunk: StreamChunk = serde_json::from_str(
            r#"{"choices":[],"usage":{"prompt_tokens":9,"completion_tokens":12,"prompt_tokens_details":{"cached_tokens":4}}}"#,
        )
        .unwrap();
        let usage = chunk.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 9);
        assert_eq!(
            usage.prompt_tokens_details.and_then(|d| d.cached_tokens),
            Some(4)
        );
    }

    #[test]
    fn test_error_code_variants() {
        let detail: ErrorDetail =
            serde_json::from_value(json!({"message": "bad", "code": "rate_limit_exceeded"}))
                .unwrap();
        assert_eq!(detail.code(), "rate_limit_exceeded");

        let detail: ErrorDetail =
            serde_json::from_value(json!({"message": "bad", "code": 500})).unwrap();
        assert_eq!(detail.code(), "500");

        let detail: ErrorDetail =
            serde_json::from_value(json!({"message": "bad", "type": "server_error"})).unwrap();
        assert_eq!(detail.code(), "server_error");
    }

    #[test]
    fn test_assistant_message_serialization() {
        let message = Message {
            role: "assistant",
            content: None,
            tool_calls: Some(vec![ToolCallRequest {
                id: "call_1".into(),
                call_type: "function",
                function: FunctionCallRequest {
                    name: "search".into(),
                    arguments: r#"{"q":"foo"}"#.into(),
                },
            }]),
            tool_call_id: None,
            name: None,
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "search", "arguments": "{\"q\":\"foo\"}"}
                }]
            })
        );
    }
}
