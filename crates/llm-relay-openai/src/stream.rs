//! SSE line parser for Chat Completions streams.

use llm_relay::Usage;
use llm_relay::stream::{FinishReason, StreamEvent, ToolKey, sse_payload};

use crate::types::{ResponseUsage, StreamChunk, StreamToolCall};

/// Parse one framed line into zero or more events.
pub(crate) fn parse_line(line: &str) -> Vec<StreamEvent> {
    let data = match sse_payload(line) {
        Ok(data) => data,
        Err(reason) => return vec![StreamEvent::Ignored(reason)],
    };

    let chunk = match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk,
        Err(e) => return vec![StreamEvent::malformed(e)],
    };

    if let Some(error) = chunk.error {
        return vec![StreamEvent::Error {
            code: error.code(),
            message: error.message,
        }];
    }

    let mut events = Vec::new();

    // Only the first choice is consumed; requests are sent with n = 1.
    if let Some(choice) = chunk.choices.into_iter().next() {
        let delta = choice.delta;
        if let Some(reasoning) = delta.reasoning_content.or(delta.reasoning)
            && !reasoning.is_empty()
        {
            events.push(StreamEvent::ThinkingDelta(reasoning));
        }
        if let Some(text) = delta.content
            && !text.is_empty()
        {
            events.push(StreamEvent::TextDelta(text));
        }
        for call in delta.tool_calls.into_iter().flatten() {
            push_tool_call(&mut events, call);
        }
        if let Some(reason) = choice.finish_reason.as_deref() {
            events.push(convert_finish_reason(reason));
        }
    }

    if let Some(usage) = &chunk.usage {
        events.push(StreamEvent::Usage(convert_usage(usage)));
    }

    events
}

fn push_tool_call(events: &mut Vec<StreamEvent>, call: StreamToolCall) {
    let key = ToolKey::Index(call.index);
    let (name, arguments) = match call.function {
        Some(function) => (function.name, function.arguments),
        None => (None, None),
    };

    // The first fragment names the call. Some compatible servers omit
    // the id; one is derived from the index.
    let id = call.id.filter(|id| !id.is_empty());
    if id.is_some() || name.as_deref().is_some_and(|n| !n.is_empty()) {
        events.push(StreamEvent::ToolCallStart {
            id: id.unwrap_or_else(|| format!("call_{}", call.index)),
            name: name.unwrap_or_default(),
            key: Some(key.clone()),
        });
    }

    if let Some(fragment) = arguments
        && !fragment.is_empty()
    {
        events.push(StreamEvent::ToolCallArgsDelta { key, fragment });
    }
}

/// Map a `finish_reason` to a finish event.
pub(crate) fn convert_finish_reason(reason: &str) -> StreamEvent {
    match reason {
        "stop" => StreamEvent::finish_final(FinishReason::Stop, reason),
        "length" | "model_length" => StreamEvent::finish(FinishReason::Length, reason),
        "tool_calls" | "function_call" => StreamEvent::finish(FinishReason::ToolCalls, reason),
        "content_filter" => StreamEvent::finish(
            FinishReason::ErrorLike("Response was blocked by the content filter".into()),
            reason,
        ),
        "error" => StreamEvent::finish(
            FinishReason::ErrorLike("The model stopped generating because of an error".into()),
            reason,
        ),
        _ => StreamEvent::finish(FinishReason::Unknown, reason),
    }
}

fn convert_usage(usage: &ResponseUsage) -> Usage {
    Usage {
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        reasoning_tokens: usage
            .completion_tokens_details
            .as_ref()
            .and_then(|d| d.reasoning_tokens),
        cache_read_tokens: usage
            .prompt_tokens_details
            .as_ref()
            .and_then(|d| d.cached_tokens),
        cache_write_tokens: None,
    }
}

#[cfg(test)]
mod tests {
    use llm_relay::stream::IgnoreReason;

    use super::*;

    #[test]
    fn test_parse_text_delta() {
        let line = r#"data: {"choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        assert_eq!(parse_line(line), vec![StreamEvent::TextDelta("Hello".into())]);
    }

    #[test]
    fn test_parse_done_sentinel() {
        assert_eq!(
            parse_line("data: [DONE]"),
            vec![StreamEvent::Ignored(IgnoreReason::Sentinel)]
        );
    }

    #[test]
    fn test_keepalive_comment_ignored() {
        assert_eq!(
            parse_line(": OPENROUTER PROCESSING"),
            vec![StreamEvent::Ignored(IgnoreReason::Comment)]
        );
    }

    #[test]
    fn test_empty_text_delta_ignored() {
        let line = r#"data: {"choices":[{"index":0,"delta":{"role":"assistant","content":""},"finish_reason":null}]}"#;
        assert!(parse_line(line).is_empty());
    }

    #[test]
    fn test_parse_finish_reason_stop() {
        let line = r#"data: {"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(
            parse_line(line),
            vec![StreamEvent::finish_final(FinishReason::Stop, "stop")]
        );
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(
            convert_finish_reason("length"),
            StreamEvent::finish(FinishReason::Length, "length")
        );
        assert_eq!(
            convert_finish_reason("model_length"),
            StreamEvent::finish(FinishReason::Length, "model_length")
        );
        assert_eq!(
            convert_finish_reason("function_call"),
            StreamEvent::finish(FinishReason::ToolCalls, "function_call")
        );
        assert!(matches!(
            convert_finish_reason("content_filter"),
            StreamEvent::Finish {
                reason: FinishReason::ErrorLike(_),
                ..
            }
        ));
        assert_eq!(
            convert_finish_reason("eos"),
            StreamEvent::finish(FinishReason::Unknown, "eos")
        );
    }

    #[test]
    fn test_parse_tool_call_lifecycle() {
        let start = r#"data: {"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_abc","type":"function","function":{"name":"search","arguments":""}}]},"finish_reason":null}]}"#;
        assert_eq!(
            parse_line(start),
            vec![StreamEvent::ToolCallStart {
                id: "call_abc".into(),
                name: "search".into(),
                key: Some(ToolKey::Index(0)),
            }]
        );

        let delta = r#"data: {"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"q\":"}}]},"finish_reason":null}]}"#;
        assert_eq!(
            parse_line(delta),
            vec![StreamEvent::ToolCallArgsDelta {
                key: ToolKey::Index(0),
                fragment: r#"{"q":"#.into(),
            }]
        );

        let done = r#"data: {"choices":[{"index":0,"delta":{},"finish_reason":"tool_calls"}]}"#;
        assert_eq!(
            parse_line(done),
            vec![StreamEvent::finish(FinishReason::ToolCalls, "tool_calls")]
        );
    }

    #[test]
    fn test_whole_tool_call_in_one_chunk() {
        let line = r#"data: {"choices":[{"index":0,"delta":{"content":"","tool_calls":[{"id":"D681PevKs","function":{"name":"search","arguments":"{\"q\": \"foo\"}"},"index":0}]},"finish_reason":"tool_calls"}]}"#;
        let events = parse_line(line);
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], StreamEvent::ToolCallStart { id, .. } if id == "D681PevKs"));
        assert!(matches!(
            &events[1],
            StreamEvent::ToolCallArgsDelta { fragment, .. } if fragment == r#"{"q": "foo"}"#
        ));
        assert_eq!(
            events[2],
            StreamEvent::finish(FinishReason::ToolCalls, "tool_calls")
        );
    }

    #[test]
    fn test_missing_tool_id_derived_from_index() {
        let line = r#"data: {"choices":[{"delta":{"tool_calls":[{"index":1,"function":{"name":"read"}}]}}]}"#;
        assert_eq!(
            parse_line(line),
            vec![StreamEvent::ToolCallStart {
                id: "call_1".into(),
                name: "read".into(),
                key: Some(ToolKey::Index(1)),
            }]
        );
    }

    #[test]
    fn test_reasoning_content() {
        let line = r#"data: {"choices":[{"index":0,"delta":{"reasoning_content":"Thinking...","content":null}}]}"#;
        assert_eq!(
            parse_line(line),
            vec![StreamEvent::ThinkingDelta("Thinking...".into())]
        );
        let line = r#"data: {"choices":[{"index":0,"delta":{"reasoning":"Hmm","content":""}}]}"#;
        assert_eq!(parse_line(line), vec![StreamEvent::ThinkingDelta("Hmm".into())]);
    }

    #[test]
    fn test_parse_usage_event() {
        let line = r#"data: {"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":20,"completion_tokens_details":{"reasoning_tokens":5}}}"#;
        let events = parse_line(line);
        let [StreamEvent::Usage(usage)] = events.as_slice() else {
            panic!("expected usage, got {events:?}");
        };
        assert_eq!(usage.input_tokens, 10);
        assert_eq!(usage.output_tokens, 20);
        assert_eq!(usage.reasoning_tokens, Some(5));
    }

    #[test]
    fn test_in_band_error() {
        let line = r#"data: {"error":{"message":"The server had an error","type":"server_error","code":null}}"#;
        assert_eq!(
            parse_line(line),
            vec![StreamEvent::Error {
                code: "server_error".into(),
                message: "The server had an error".into(),
            }]
        );
    }

    #[test]
    fn test_parse_unparseable_event_ignored() {
        assert!(matches!(
            parse_line("data: {not json").as_slice(),
            [StreamEvent::Ignored(IgnoreReason::Malformed(_))]
        ));
    }
}
