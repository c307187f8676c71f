//! Conversion of assistant turns, tool results and tool definitions to
//! Anthropic request JSON.

use llm_relay::message::{ContentBlock as Block, Message as RelayMessage, ToolResult};
use llm_relay::tool::ToolDefinition;
use serde_json::Value;
use tracing::warn;

use crate::types::{ContentBlock, Message, Tool};

fn to_value(message: &Message) -> Option<Value> {
    serde_json::to_value(message)
        .inspect_err(|e| warn!(error = %e, "failed to serialize Anthropic history message"))
        .ok()
}

/// The assistant turn: one `assistant` message holding every block in
/// order. Empty text is dropped; signatures are kept only when present.
pub(crate) fn assistant_turn(message: &RelayMessage) -> Vec<Value> {
    let content: Vec<ContentBlock> = message
        .blocks()
        .iter()
        .filter_map(|block| match block {
            Block::Text(text) if text.is_empty() => None,
            Block::Text(text) => Some(ContentBlock::Text { text: text.clone() }),
            Block::Thinking { text, signature } => Some(ContentBlock::Thinking {
                thinking: text.clone(),
                signature: signature.clone(),
            }),
            Block::RedactedThinking(data) => {
                Some(ContentBlock::RedactedThinking { data: data.clone() })
            }
            Block::ToolUse(call) => Some(ContentBlock::ToolUse {
                id: call.id.clone(),
                name: call.name.clone(),
                input: call.input.clone(),
            }),
            Block::ToolResult(_) => None,
        })
        .collect();

    to_value(&Message {
        role: "assistant",
        content,
    })
    .into_iter()
    .collect()
}

/// All results in one `user` message of `tool_result` blocks.
pub(crate) fn tool_results(results: &[ToolResult]) -> Vec<Value> {
    if results.is_empty() {
        return Vec::new();
    }
    let content = results
        .iter()
        .map(|result| ContentBlock::ToolResult {
            tool_use_id: result.id.clone(),
            content: result.content.clone(),
            is_error: result.is_error,
        })
        .collect();
    to_value(&Message {
        role: "user",
        content,
    })
    .into_iter()
    .collect()
}

/// Tools as `{name, description, input_schema}` entries.
pub(crate) fn tool_definitions(tools: &[ToolDefinition]) -> Value {
    let tools: Vec<Tool<'_>> = tools
        .iter()
        .map(|t| Tool {
            name: &t.name,
            description: &t.description,
            input_schema: &t.parameters,
        })
        .collect();
    serde_json::to_value(tools)
        .inspect_err(|e| warn!(error = %e, "failed to serialize Anthropic tool definitions"))
        .unwrap_or_else(|_| Value::Array(Vec::new()))
}
