//! Conversion of assistant turns and tool results to Gemini `contents`,
//! and of tool definitions to `functionDeclarations`.

use llm_relay::message::{ContentBlock, Message, ToolResult};
use llm_relay::tool::ToolDefinition;
use serde_json::{Value, json};
use tracing::warn;

use crate::types::{Content, FunctionCall, FunctionDeclaration, FunctionResponse, Part, Tool};

fn to_value(content: &Content) -> Option<Value> {
    serde_json::to_value(content)
        .inspect_err(|e| warn!(error = %e, "failed to serialize Gemini content"))
        .ok()
}

/// One `model` turn. Signed thoughts are echoed so the model keeps its
/// reasoning context; unsigned ones are dropped.
pub(crate) fn assistant_turn(message: &Message) -> Vec<Value> {
    let parts: Vec<Part> = message
        .blocks()
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text(text) if !text.is_empty() => Some(Part {
                text: Some(text.clone()),
                ..Default::default()
            }),
            ContentBlock::Thinking {
                text,
                signature: Some(signature),
            } => Some(Part {
                text: Some(text.clone()),
                thought: Some(true),
                thought_signature: Some(signature.clone()),
                ..Default::default()
            }),
            ContentBlock::ToolUse(call) => Some(Part {
                function_call: Some(FunctionCall {
                    id: None,
                    name: call.name.clone(),
                    args: call.input.clone(),
                }),
                ..Default::default()
            }),
            _ => None,
        })
        .collect();

    to_value(&Content {
        role: Some("model".into()),
        parts,
    })
    .into_iter()
    .collect()
}

/// One `user` turn of `functionResponse` parts, keyed by tool name.
pub(crate) fn tool_results(results: &[ToolResult]) -> Vec<Value> {
    if results.is_empty() {
        return Vec::new();
    }
    let parts = results
        .iter()
        .map(|result| {
            let response = if result.is_error {
                json!({"error": result.content})
            } else {
                json!({"result": result.content})
            };
            Part {
                function_response: Some(FunctionResponse {
                    name: result.name.clone(),
                    response,
                }),
                ..Default::default()
            }
        })
        .collect();
    to_value(&Content {
        role: Some("user".into()),
        parts,
    })
    .into_iter()
    .collect()
}

/// All tools as the declarations of a single `tools` entry.
pub(crate) fn tool_definitions(tools: &[ToolDefinition]) -> Value {
    if tools.is_empty() {
        return Value::Array(Vec::new());
    }
    let tool = Tool {
        function_declarations: tools
            .iter()
            .map(|t| FunctionDeclaration {
                name: &t.name,
                description: &t.description,
                parameters: &t.parameters,
            })
            .collect(),
    };
    serde_json::to_value([tool])
        .inspect_err(|e| warn!(error = %e, "failed to serialize Gemini tool declarations"))
        .unwrap_or_else(|_| Value::Array(Vec::new()))
}
