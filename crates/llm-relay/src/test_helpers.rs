//! Pre-built helpers for testing code built on `llm-relay`.
//!
//! Available with the `test-utils` feature so vendor crates can reuse
//! them in their own suites; also compiled for this crate's tests.
//! Provides a vendor-neutral [`EventJsonProvider`], sample tools, and
//! collectors for [`SessionEvent`] channels.

use std::borrow::Cow;
use std::collections::HashSet;
use std::future::Ready;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use http::HeaderMap;
use http::header::{CONTENT_TYPE, HeaderValue};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::error::LlmError;
use crate::message::{ContentBlock, Message, ToolCall, ToolResult};
use crate::provider::{Capability, Provider, ProviderMetadata};
use crate::session::SessionEvent;
use crate::stream::{IgnoreReason, StreamEvent};
use crate::tool::{FnToolHandler, ToolDefinition, ToolError, ToolHandler, ToolOutput, tool_fn};
use crate::usage::Usage;

/// A provider whose wire format is one JSON-encoded [`StreamEvent`] per
/// line, with chat-completions-shaped history entries.
///
/// Lets session tests script exact event sequences without depending
/// on any vendor format.
#[derive(Debug, Clone, Default)]
pub struct EventJsonProvider {
    stop_implies_tool_use: bool,
    no_tools: bool,
    request_timeout: Option<Duration>,
}

impl EventJsonProvider {
    /// Creates a provider with a dedicated tool-call finish code.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider that treats a plain stop with tool calls as a
    /// request for tool results.
    pub fn stop_implies_tool_use() -> Self {
        Self {
            stop_implies_tool_use: true,
            ..Self::default()
        }
    }

    /// Sets the per-request timeout the provider reports.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Creates a provider that does not advertise tool support.
    pub fn without_tools() -> Self {
        Self {
            no_tools: true,
            ..Self::default()
        }
    }
}

impl Provider for EventJsonProvider {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: Cow::Borrowed("event-json"),
            model: "test-model".into(),
            capabilities: if self.no_tools {
                HashSet::from([Capability::Reasoning])
            } else {
                HashSet::from([Capability::Tools, Capability::Reasoning])
            },
        }
    }

    fn endpoint_url(&self) -> String {
        "http://mock.local/v1/stream".into()
    }

    fn headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    fn parse_line(&self, line: &str) -> Vec<StreamEvent> {
        if line.trim().is_empty() {
            return vec![StreamEvent::Ignored(IgnoreReason::Blank)];
        }
        match serde_json::from_str::<StreamEvent>(line) {
            Ok(event) => vec![event],
            Err(e) => vec![StreamEvent::malformed(e)],
        }
    }

    fn stop_implies_tool_use(&self) -> bool {
        self.stop_implies_tool_use
    }

    fn assistant_turn(&self, message: &Message) -> Vec<Value> {
        let text = message.text();
        let mut turn = json!({
            "role": "assistant",
            "content": if text.is_empty() { Value::Null } else { Value::String(text) },
        });
        let calls: Vec<Value> = message
            .blocks()
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse(call) => Some(json!({
                    "id": call.id,
                    "name": call.name,
                    "input": call.input,
                })),
                _ => None,
            })
            .collect();
        if !calls.is_empty() {
            turn["tool_calls"] = Value::Array(calls);
        }
        vec![turn]
    }

    fn tool_results(&self, results: &[ToolResult]) -> Vec<Value> {
        results
            .iter()
            .map(|r| json!({"role": "tool", "tool_call_id": r.id, "content": r.content}))
            .collect()
    }

    fn tool_definitions(&self, tools: &[ToolDefinition]) -> Value {
        serde_json::to_value(tools).unwrap_or_default()
    }
}

/// Encodes events as a newline-delimited body for [`EventJsonProvider`].
pub fn event_body(events: &[StreamEvent]) -> Vec<u8> {
    let mut body = Vec::new();
    for event in events {
        // Events are plain data; serialization cannot fail.
        if let Ok(line) = serde_json::to_vec(event) {
            body.extend_from_slice(&line);
            body.push(b'\n');
        }
    }
    body
}

/// Shorthand for a [`ToolCall`].
pub fn call(id: &str, name: &str, input: Value) -> ToolCall {
    ToolCall {
        id: id.into(),
        name: name.into(),
        input,
    }
}

/// A permissive definition for test tools.
pub fn tool_definition(name: &str) -> ToolDefinition {
    ToolDefinition {
        name: name.into(),
        description: format!("test tool {name}"),
        parameters: json!({"type": "object"}),
    }
}

/// A tool that returns its input, serialized compactly.
pub fn echo_tool(
    name: &str,
) -> FnToolHandler<impl Fn(Value) -> Ready<Result<String, ToolError>> + Send + Sync + 'static> {
    tool_fn(tool_definition(name), |input: Value| {
        std::future::ready(Ok(input.to_string()))
    })
}

/// A tool that always fails with `message`.
pub fn failing_tool(name: &str, message: &str) -> impl ToolHandler + 'static {
    let message = message.to_string();
    tool_fn(tool_definition(name), move |_input: Value| {
        std::future::ready(Err::<String, _>(ToolError::new(message.clone())))
    })
}

/// A tool that panics when executed.
pub fn panicking_tool(name: &str) -> impl ToolHandler + 'static {
    tool_fn(tool_definition(name), |_input: Value| async move {
        if true {
            panic!("tool exploded");
        }
        Ok::<_, ToolError>(ToolOutput::new(""))
    })
}

/// A tool that never finishes.
pub fn pending_tool(name: &str) -> impl ToolHandler + 'static {
    tool_fn(tool_definition(name), |_input: Value| {
        std::future::pending::<Result<String, ToolError>>()
    })
}

/// A tool that sleeps for `delay`, then returns `done`.
pub fn slow_tool(name: &str, delay: Duration) -> impl ToolHandler + 'static {
    tool_fn(tool_definition(name), move |_input: Value| async move {
        tokio::time::sleep(delay).await;
        Ok::<_, ToolError>("done".to_string())
    })
}

/// Records tool start/end order and peak concurrency.
#[derive(Debug, Default)]
pub struct ConcurrencyTracker {
    running: AtomicUsize,
    max: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl ConcurrencyTracker {
    /// Creates an empty tracker.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A tool that logs `start {tag}` / `end {tag}` around a `delay`,
    /// where `tag` is the input's `"tag"` field.
    pub fn tool(self: &Arc<Self>, name: &str, delay: Duration) -> impl ToolHandler + 'static {
        let tracker = Arc::clone(self);
        tool_fn(tool_definition(name), move |input: Value| {
            let tracker = Arc::clone(&tracker);
            async move {
                let tag = input["tag"].as_str().unwrap_or_default().to_string();
                let now = tracker.running.fetch_add(1, Ordering::SeqCst) + 1;
                tracker.max.fetch_max(now, Ordering::SeqCst);
                tracker.push(format!("start {tag}"));
                tokio::time::sleep(delay).await;
                tracker.push(format!("end {tag}"));
                tracker.running.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, ToolError>(format!("ok {tag}"))
            }
        })
    }

    fn push(&self, entry: String) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// Highest number of tracked tools observed running at once.
    pub fn max_concurrent(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }

    /// Start/end entries in order.
    pub fn log(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Receives events until the next terminal event, inclusive.
///
/// # Panics
///
/// Panics if no terminal event arrives within five seconds or the
/// channel closes first.
pub async fn collect_until_terminal(
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
) -> Vec<SessionEvent> {
    let mut collected = Vec::new();
    loop {
        let next = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for a terminal session event")
            .expect("session event channel closed");
        let terminal = next.is_terminal();
        collected.push(next);
        if terminal {
            return collected;
        }
    }
}

/// Concatenates every `PartialResponse` text in `events`.
pub fn partial_text(events: &[SessionEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::PartialResponse { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Returns a [`Usage`] with 100 input / 50 output tokens.
pub fn sample_usage() -> Usage {
    Usage {
        input_tokens: 100,
        output_tokens: 50,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::FinishReason;

    #[test]
    fn test_event_body_round_trips_through_provider() {
        let events = vec![
            StreamEvent::TextDelta("a\nb".into()),
            StreamEvent::finish(FinishReason::Stop, "stop"),
        ];
        let body = String::from_utf8(event_body(&events)).unwrap();
        let provider = EventJsonProvider::new();
        let parsed: Vec<_> = body.lines().flat_map(|l| provider.parse_line(l)).collect();
        assert_eq!(parsed, events);
    }

    #[test]
    fn test_event_json_provider_malformed() {
        let provider = EventJsonProvider::new();
        assert!(matches!(
            provider.parse_line("{not json").as_slice(),
            [StreamEvent::Ignored(IgnoreReason::Malformed(_))]
        ));
    }

    #[test]
    fn test_assistant_turn_shape() {
        let provider = EventJsonProvider::new();
        let mut message = Message::new();
        message.apply(StreamEvent::TextDelta("hi".into())).unwrap();
        let turn = provider.assistant_turn(&message);
        assert_eq!(turn, vec![json!({"role": "assistant", "content": "hi"})]);
    }
}
