//! SSE line parser for the Responses API.
//!
//! Function calls have two ids: the output item id, used by argument
//! events, and the `call_id` the model expects results for. The call
//! starts under its `call_id` with the item id registered as an alias.

use llm_relay::Usage;
use llm_relay::stream::{FinishReason, StreamEvent, ToolKey, sse_payload};

use super::types::{OutputItem, ResponseBody, ResponseEvent, ResponseUsage};

/// Parse one framed line into zero or more events.
pub(crate) fn parse_line(line: &str) -> Vec<StreamEvent> {
    let data = match sse_payload(line) {
        Ok(data) => data,
        Err(reason) => return vec![StreamEvent::Ignored(reason)],
    };

    let event = match serde_json::from_str::<ResponseEvent>(data) {
        Ok(event) => event,
        Err(e) => return vec![StreamEvent::malformed(e)],
    };

    match event.event_type.as_str() {
        "response.output_text.delta" => text(event.delta, StreamEvent::TextDelta),
        "response.reasoning_summary_text.delta"
        | "response.reasoning_text.delta"
        | "response.reasoning_content.delta" => text(event.delta, StreamEvent::ThinkingDelta),
        "response.output_item.added" => event.item.and_then(item_added).into_iter().collect(),
        "response.function_call_arguments.delta" => match (event.item_id, event.delta) {
            (Some(item_id), Some(fragment)) if !fragment.is_empty() => {
                vec![StreamEvent::ToolCallArgsDelta {
                    key: ToolKey::Item(item_id),
                    fragment,
                }]
            }
            _ => Vec::new(),
        },
        "response.function_call_arguments.done" => event
            .item_id
            .map(|item_id| StreamEvent::ToolCallDone {
                key: ToolKey::Item(item_id),
            })
            .into_iter()
            .collect(),
        "response.output_item.done" => event.item.and_then(item_done).into_iter().collect(),
        "response.completed" => lifecycle(
            event.response.as_ref(),
            StreamEvent::finish(FinishReason::Stop, "completed"),
        ),
        "response.incomplete" => {
            let reason = event
                .response
                .as_ref()
                .and_then(|r| r.incomplete_details.as_ref())
                .and_then(|d| d.reason.clone())
                .unwrap_or_else(|| "incomplete".into());
            lifecycle(event.response.as_ref(), convert_incomplete_reason(&reason))
        }
        "response.failed" => {
            let error = event.response.and_then(|r| r.error);
            vec![StreamEvent::Error {
                code: error
                    .as_ref()
                    .and_then(|e| e.code.clone())
                    .unwrap_or_else(|| "failed".into()),
                message: error
                    .map(|e| e.message)
                    .unwrap_or_else(|| "response failed".into()),
            }]
        }
        "error" => vec![StreamEvent::Error {
            code: event.code.unwrap_or_else(|| "error".into()),
            message: event.message.unwrap_or_default(),
        }],
        other => vec![StreamEvent::unhandled(other)],
    }
}

fn text(delta: Option<String>, event: fn(String) -> StreamEvent) -> Vec<StreamEvent> {
    delta
        .filter(|d| !d.is_empty())
        .map(event)
        .into_iter()
        .collect()
}

fn item_added(item: OutputItem) -> Option<StreamEvent> {
    if item.item_type != "function_call" {
        return None;
    }
    let call_id = item.call_id.filter(|id| !id.is_empty())?;
    Some(StreamEvent::ToolCallStart {
        id: call_id,
        name: item.name.unwrap_or_default(),
        key: item.id.map(ToolKey::Item),
    })
}

fn item_done(item: OutputItem) -> Option<StreamEvent> {
    if item.item_type != "function_call" {
        return None;
    }
    let key = match (item.call_id, item.id) {
        (Some(call_id), _) => ToolKey::Id(call_id),
        (None, Some(item_id)) => ToolKey::Item(item_id),
        (None, None) => return None,
    };
    Some(StreamEvent::ToolCallDone { key })
}

fn lifecycle(response: Option<&ResponseBody>, finish: StreamEvent) -> Vec<StreamEvent> {
    let mut events = vec![finish];
    if let Some(usage) = response.and_then(|r| r.usage.as_ref()) {
        events.push(StreamEvent::Usage(convert_usage(usage)));
    }
    events
}

/// Map `incomplete_details.reason` to a finish event.
pub(crate) fn convert_incomplete_reason(reason: &str) -> StreamEvent {
    match reason {
        "max_output_tokens" => StreamEvent::finish(FinishReason::Length, reason),
        "content_filter" => StreamEvent::finish(
            FinishReason::ErrorLike("Response was blocked by the content filter".into()),
            reason,
        ),
        _ => StreamEvent::finish(FinishReason::Unknown, reason),
    }
}

fn convert_usage(usage: &ResponseUsage) -> Usage {
    Usage {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        reasoning_tokens: usage
            .output_tokens_details
            .as_ref()
            .and_then(|d| d.reasoning_tokens),
        cache_read_tokens: usage
            .input_tokens_details
            .as_ref()
            .and_then(|d| d.cached_tokens),
        cache_write_tokens: None,
    }
}
