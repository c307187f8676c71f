//! SSE line parser for the Anthropic Messages API.
//!
//! Each `data:` line carries one JSON event whose `type` selects the
//! handler. Tool-call fragments are keyed by content block index; the
//! message builder pairs them with the id announced in
//! `content_block_start`.

use llm_relay::Usage;
use llm_relay::stream::{FinishReason, StreamEvent, ToolKey, sse_payload};

use crate::types::{ResponseUsage, StreamResponse};

/// Parse one framed line into zero or more events.
pub(crate) fn parse_line(line: &str) -> Vec<StreamEvent> {
    let data = match sse_payload(line) {
        Ok(data) => data,
        Err(reason) => return vec![StreamEvent::Ignored(reason)],
    };

    let response = match serde_json::from_str::<StreamResponse>(data) {
        Ok(response) => response,
        Err(e) => return vec![StreamEvent::malformed(e)],
    };

    match response.event_type.as_str() {
        "message_start" => handle_message_start(&response),
        "content_block_start" => handle_block_start(response),
        "content_block_delta" => handle_block_delta(response),
        "content_block_stop" => handle_block_stop(&response),
        "message_delta" => handle_message_delta(&response),
        "error" => handle_error(response),
        other => vec![StreamEvent::unhandled(other)],
    }
}

fn handle_message_start(response: &StreamResponse) -> Vec<StreamEvent> {
    response
        .message
        .as_ref()
        .and_then(|m| m.usage.as_ref())
        .map(|usage| StreamEvent::Usage(convert_usage(usage)))
        .into_iter()
        .collect()
}

fn handle_block_start(response: StreamResponse) -> Vec<StreamEvent> {
    let (Some(index), Some(block)) = (response.index, response.content_block) else {
        return vec![StreamEvent::malformed("content_block_start without index or block")];
    };

    let mut events = Vec::new();
    match block.block_type.as_str() {
        "tool_use" | "server_tool_use" => events.push(StreamEvent::ToolCallStart {
            id: block.id.unwrap_or_else(|| format!("toolu_{index}")),
            name: block.name.unwrap_or_default(),
            key: Some(ToolKey::Index(index)),
        }),
        "text" => events.extend(block.text.filter(|t| !t.is_empty()).map(StreamEvent::TextDelta)),
        "thinking" => {
            events.extend(
                block
                    .thinking
                    .filter(|t| !t.is_empty())
                    .map(StreamEvent::ThinkingDelta),
            );
            events.extend(
                block
                    .signature
                    .filter(|s| !s.is_empty())
                    .map(StreamEvent::ThinkingSignature),
            );
        }
        "redacted_thinking" => {
            events.extend(block.data.or(block.signature).map(StreamEvent::RedactedThinking));
        }
        other => events.push(StreamEvent::unhandled(other)),
    }
    events
}

fn handle_block_delta(response: StreamResponse) -> Vec<StreamEvent> {
    let (Some(index), Some(delta)) = (response.index, response.delta) else {
        return vec![StreamEvent::malformed("content_block_delta without index or delta")];
    };

    let event = match delta.delta_type.as_deref() {
        Some("text_delta") => delta.text.map(StreamEvent::TextDelta),
        Some("thinking_delta") => delta.thinking.map(StreamEvent::ThinkingDelta),
        Some("signature_delta") => delta.signature.map(StreamEvent::ThinkingSignature),
        Some("input_json_delta") => delta.partial_json.map(|fragment| StreamEvent::ToolCallArgsDelta {
            key: ToolKey::Index(index),
            fragment,
        }),
        other => Some(StreamEvent::unhandled(other.unwrap_or("delta"))),
    };
    event.into_iter().collect()
}

fn handle_block_stop(response: &StreamResponse) -> Vec<StreamEvent> {
    // Stops for text and thinking blocks resolve to no call and are ignored.
    response
        .index
        .map(|index| StreamEvent::ToolCallDone {
            key: ToolKey::Index(index),
        })
        .into_iter()
        .collect()
}

fn handle_message_delta(response: &StreamResponse) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    if let Some(reason) = response.delta.as_ref().and_then(|d| d.stop_reason.as_deref()) {
        events.push(convert_stop_reason(reason));
    }
    if let Some(usage) = &response.usage {
        events.push(StreamEvent::Usage(convert_usage(usage)));
    }
    events
}

fn handle_error(response: StreamResponse) -> Vec<StreamEvent> {
    let error = response.error.unwrap_or_else(|| crate::types::StreamError {
        error_type: "error".into(),
        message: "unknown stream error".into(),
    });
    vec![StreamEvent::Error {
        code: error.error_type,
        message: error.message,
    }]
}

/// Map a `stop_reason` to a finish event.
pub(crate) fn convert_stop_reason(reason: &str) -> StreamEvent {
    match reason {
        "end_turn" => StreamEvent::finish_final(FinishReason::Stop, reason),
        "stop_sequence" => StreamEvent::finish(FinishReason::Stop, reason),
        "max_tokens" | "model_context_window_exceeded" => {
            StreamEvent::finish(FinishReason::Length, reason)
        }
        "tool_use" => StreamEvent::finish(FinishReason::ToolCalls, reason),
        "refusal" => StreamEvent::finish(
            FinishReason::ErrorLike("Claude declined to respond to this request".into()),
            reason,
        ),
        _ => StreamEvent::finish(FinishReason::Unknown, reason),
    }
}

fn convert_usage(usage: &ResponseUsage) -> Usage {
    Usage {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        reasoning_tokens: None,
        cache_read_tokens: usage.cache_read_input_tokens,
        cache_write_tokens: usage.cache_creation_input_tokens,
    }
}
