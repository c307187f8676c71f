//! SSE line parser for `streamGenerateContent?alt=sse`.
//!
//! Gemini sends every function call whole, in a single part, so each one
//! becomes a start, one argument fragment and a done. Calls without an
//! `id` get a fresh UUID.

use llm_relay::Usage;
use llm_relay::stream::{FinishReason, StreamEvent, ToolKey, sse_payload};
use tracing::trace;
use uuid::Uuid;

use crate::types::{FunctionCall, GenerateContentResponse, Part, UsageMetadata};

/// Parse one framed line into zero or more events.
pub(crate) fn parse_line(line: &str) -> Vec<StreamEvent> {
    let data = match sse_payload(line) {
        Ok(data) => data,
        Err(reason) => return vec![StreamEvent::Ignored(reason)],
    };

    let response = match serde_json::from_str::<GenerateContentResponse>(data) {
        Ok(response) => response,
        Err(e) => return vec![StreamEvent::malformed(e)],
    };

    if let Some(error) = response.error {
        return vec![StreamEvent::Error {
            code: error.status.unwrap_or_else(|| error.code.to_string()),
            message: error.message,
        }];
    }

    let mut events = Vec::new();

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        events.push(StreamEvent::finish(
            FinishReason::ErrorLike(format!("The prompt was blocked ({reason})")),
            reason,
        ));
    }

    if let Some(candidate) = response.candidates.into_iter().next() {
        for part in candidate.content.into_iter().flat_map(|c| c.parts) {
            push_part(&mut events, part);
        }
        if let Some(reason) = candidate.finish_reason.as_deref() {
            events.push(convert_finish_reason(reason));
        }
    }

    if let Some(usage) = &response.usage_metadata {
        events.push(StreamEvent::Usage(convert_usage(usage)));
    }

    events
}

fn push_part(events: &mut Vec<StreamEvent>, part: Part) {
    if let Some(call) = part.function_call {
        push_function_call(events, call);
        return;
    }
    let Some(text) = part.text else {
        trace!("skipping part without text or function call");
        return;
    };
    if part.thought == Some(true) {
        if !text.is_empty() {
            events.push(StreamEvent::ThinkingDelta(text));
        }
        if let Some(signature) = part.thought_signature {
            events.push(StreamEvent::ThinkingSignature(signature));
        }
    } else if !text.is_empty() {
        events.push(StreamEvent::TextDelta(text));
    }
}

fn push_function_call(events: &mut Vec<StreamEvent>, call: FunctionCall) {
    let id = call
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let key = ToolKey::Id(id.clone());
    events.push(StreamEvent::ToolCallStart {
        id,
        name: call.name,
        key: None,
    });
    if !call.args.is_null() {
        events.push(StreamEvent::ToolCallArgsDelta {
            key: key.clone(),
            fragment: call.args.to_string(),
        });
    }
    events.push(StreamEvent::ToolCallDone { key });
}

/// Map a `finishReason` to a finish event.
pub(crate) fn convert_finish_reason(reason: &str) -> StreamEvent {
    let blocked = |why: &str| {
        StreamEvent::finish(
            FinishReason::ErrorLike(format!("Response stopped: {why}")),
            reason,
        )
    };
    match reason {
        "STOP" => StreamEvent::finish(FinishReason::Stop, reason),
        "MAX_TOKENS" => StreamEvent::finish(FinishReason::Length, reason),
        "SAFETY" | "IMAGE_SAFETY" => blocked("flagged by safety filters"),
        "RECITATION" => blocked("flagged for recitation"),
        "BLOCKLIST" | "PROHIBITED_CONTENT" => blocked("contains prohibited content"),
        "SPII" => blocked("contains sensitive personal information"),
        "MALFORMED_FUNCTION_CALL" => blocked("the model produced a malformed function call"),
        "LANGUAGE" => blocked("unsupported language"),
        _ => StreamEvent::finish(FinishReason::Unknown, reason),
    }
}

fn convert_usage(usage: &UsageMetadata) -> Usage {
    Usage {
        input_tokens: usage.prompt_token_count,
        output_tokens: usage.candidates_token_count,
        reasoning_tokens: usage.thoughts_token_count,
        cache_read_tokens: usage.cached_content_token_count,
        cache_write_tokens: None,
    }
}
