//! Conversion of assistant turns and tool results to Chat Completions
//! history, and of tool definitions to the `tools` array.

use llm_relay::message::{Message as RelayMessage, ToolResult};
use llm_relay::tool::ToolDefinition;
use serde_json::Value;
use tracing::warn;

use crate::config::OpenAiFlavor;
use crate::types::{FunctionCallRequest, FunctionDef, Message, Tool, ToolCallRequest};

fn to_value(message: &Message) -> Option<Value> {
    serde_json::to_value(message)
        .inspect_err(|e| warn!(error = %e, "failed to serialize chat history message"))
        .ok()
}

/// One `assistant` message: all text joined into `content` (or `null`)
/// plus every tool call. Reasoning is not sent back.
pub(crate) fn assistant_turn(message: &RelayMessage) -> Vec<Value> {
    let text = message.text();
    let tool_calls: Vec<ToolCallRequest> = message
        .tool_calls()
        .map(|call| ToolCallRequest {
            id: call.id.clone(),
            call_type: "function",
            function: FunctionCallRequest {
                name: call.name.clone(),
                arguments: call.input.to_string(),
            },
        })
        .collect();

    to_value(&Message {
        role: "assistant",
        content: (!text.is_empty()).then_some(text),
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        tool_call_id: None,
        name: None,
    })
    .into_iter()
    .collect()
}

/// One `tool` message per result.
pub(crate) fn tool_results(flavor: OpenAiFlavor, results: &[ToolResult]) -> Vec<Value> {
    results
        .iter()
        .filter_map(|result| {
            to_value(&Message {
                role: "tool",
                content: Some(result.content.clone()),
                tool_calls: None,
                tool_call_id: Some(result.id.clone()),
                name: flavor
                    .tool_result_includes_name()
                    .then(|| result.name.clone()),
            })
        })
        .collect()
}

/// Tools as `{"type": "function", "function": {...}}` entries.
pub(crate) fn tool_definitions(tools: &[ToolDefinition]) -> Value {
    let tools: Vec<Tool<'_>> = tools
        .iter()
        .map(|t| Tool {
            tool_type: "function",
            function: FunctionDef {
                name: &t.name,
                description: &t.description,
                parameters: &t.parameters,
            },
        })
        .collect();
    serde_json::to_value(tools)
        .inspect_err(|e| warn!(error = %e, "failed to serialize chat tool definitions"))
        .unwrap_or_else(|_| Value::Array(Vec::new()))
}
