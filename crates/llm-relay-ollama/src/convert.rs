//! Conversion of assistant turns and tool results to Ollama `messages`.

use llm_relay::message::{ContentBlock, Message as RelayMessage, ToolResult};
use llm_relay::tool::ToolDefinition;
use serde_json::Value;
use tracing::warn;

use crate::types::{FunctionCallRequest, Message, Tool, ToolCallRequest, ToolFunction};

fn to_value(message: &Message) -> Option<Value> {
    serde_json::to_value(message)
        .inspect_err(|e| warn!(error = %e, "failed to serialize Ollama message"))
        .ok()
}

/// One `assistant` message carrying the round's text, reasoning and
/// tool calls.
pub(crate) fn assistant_turn(message: &RelayMessage) -> Vec<Value> {
    let tool_calls: Vec<ToolCallRequest> = message
        .tool_calls()
        .map(|call| ToolCallRequest {
            function: FunctionCallRequest {
                name: call.name.clone(),
                arguments: call.input.clone(),
            },
        })
        .collect();
    let thinking: String = message
        .blocks()
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Thinking { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();

    to_value(&Message {
        role: "assistant".into(),
        content: message.text(),
        thinking: (!thinking.is_empty()).then_some(thinking),
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        tool_name: None,
    })
    .into_iter()
    .collect()
}

/// One `tool` message per result.
pub(crate) fn tool_results(results: &[ToolResult]) -> Vec<Value> {
    results
        .iter()
        .filter_map(|result| {
            to_value(&Message {
                role: "tool".into(),
                content: result.content.clone(),
                thinking: None,
                tool_calls: None,
                tool_name: Some(result.name.clone()),
            })
        })
        .collect()
}

/// Tools in the chat-completions `function` wrapper Ollama accepts.
pub(crate) fn tool_definitions(tools: &[ToolDefinition]) -> Value {
    let tools: Vec<Tool<'_>> = tools
        .iter()
        .map(|t| Tool {
            tool_type: "function",
            function: ToolFunction {
                name: &t.name,
                description: &t.description,
                parameters: &t.parameters,
            },
        })
        .collect();
    serde_json::to_value(tools)
        .inspect_err(|e| warn!(error = %e, "failed to serialize Ollama tools"))
        .unwrap_or_else(|_| Value::Array(Vec::new()))
}
