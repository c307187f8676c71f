//! JSON Lines parser for the Ollama Chat API.
//!
//! Ollama streams one JSON object per line, not SSE. Tool calls arrive
//! whole, so each becomes a start, one argument fragment and a done.

use llm_relay::Usage;
use llm_relay::stream::{FinishReason, IgnoreReason, StreamEvent, ToolKey};
use uuid::Uuid;

use crate::types::{StreamChunk, ToolCallResponse};

/// Parse a single JSON line into zero or more `StreamEvent`s.
pub(crate) fn parse_line(line: &str) -> Vec<StreamEvent> {
    let line = line.trim();
    if line.is_empty() {
        return vec![StreamEvent::Ignored(IgnoreReason::Blank)];
    }

    let chunk = match serde_json::from_str::<StreamChunk>(line) {
        Ok(chunk) => chunk,
        Err(e) => return vec![StreamEvent::malformed(e)],
    };

    if let Some(message) = chunk.error {
        return vec![StreamEvent::Error {
            code: "error".into(),
            message,
        }];
    }

    let mut events = Vec::new();

    if let Some(message) = chunk.message {
        if let Some(thinking) = message.thinking.filter(|t| !t.is_empty()) {
            events.push(StreamEvent::ThinkingDelta(thinking));
        }
        if let Some(text) = message.content.filter(|t| !t.is_empty()) {
            events.push(StreamEvent::TextDelta(text));
        }
        for call in message.tool_calls {
            push_tool_call(&mut events, call);
        }
    }

    if chunk.done {
        let input_tokens = chunk.prompt_eval_count.unwrap_or(0);
        let output_tokens = chunk.eval_count.unwrap_or(0);
        if input_tokens > 0 || output_tokens > 0 {
            events.push(StreamEvent::Usage(Usage {
                input_tokens,
                output_tokens,
                ..Usage::default()
            }));
        }
        events.push(convert_done_reason(chunk.done_reason.as_deref()));
    }

    events
}

// Ollama usually sends no call id, and its per-line positions restart
// at zero, so a missing id gets a fresh UUID.
fn push_tool_call(events: &mut Vec<StreamEvent>, call: ToolCallResponse) {
    let id = call
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple()));
    let key = ToolKey::Id(id.clone());

    events.push(StreamEvent::ToolCallStart {
        id,
        name: call.function.name,
        key: None,
    });
    if !call.function.arguments.is_null() {
        events.push(StreamEvent::ToolCallArgsDelta {
            key: key.clone(),
            fragment: call.function.arguments.to_string(),
        });
    }
    events.push(StreamEvent::ToolCallDone { key });
}

/// Map `done_reason` on the final chunk. Older servers omit it.
pub(crate) fn convert_done_reason(reason: Option<&str>) -> StreamEvent {
    match reason {
        None | Some("stop") => StreamEvent::finish(FinishReason::Stop, reason.unwrap_or("stop")),
        Some("length") => StreamEvent::finish(FinishReason::Length, "length"),
        Some(other) => StreamEvent::finish(FinishReason::Unknown, other),
    }
}
