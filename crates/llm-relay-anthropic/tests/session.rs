//! End-to-end sessions over recorded Messages API streams.

use std::sync::Arc;

use llm_relay::mock::MockTransport;
use llm_relay::session::{Coordinator, CoordinatorConfig, LlmRequest, SessionEvent};
use llm_relay::test_helpers::{collect_until_terminal, echo_tool, partial_text};
use llm_relay::tool::ToolFilter;
use llm_relay::transport::Transport;
use llm_relay::ToolRegistry;
use llm_relay_anthropic::{AnthropicConfig, AnthropicProvider};
use serde_json::json;

const TOOL_ROUND: &str = r#"event: message_start
data: {"type":"message_start","message":{"id":"msg_01","type":"message","role":"assistant","content":[],"model":"claude-sonnet-4-5","stop_reason":null,"usage":{"input_tokens":120,"output_tokens":1}}}

event: content_block_start
data: {"type":"content_block_start","index":0,"content_block":{"type":"thinking","thinking":""}}

event: content_block_delta
data: {"type":"content_block_delta","index":0,"delta":{"type":"thinking_delta","thinking":"The user wants foo."}}

event: content_block_delta
data: {"type":"content_block_delta","index":0,"delta":{"type":"signature_delta","signature":"EqQBsig"}}

event: content_block_stop
data: {"type":"content_block_stop","index":0}

event: content_block_start
data: {"type":"content_block_start","index":1,"content_block":{"type":"text","text":""}}

event: ping
data: {"type":"ping"}

event: content_block_delta
data: {"type":"content_block_delta","index":1,"delta":{"type":"text_delta","text":"Searching now."}}

event: content_block_stop
data: {"type":"content_block_stop","index":1}

event: content_block_start
data: {"type":"content_block_start","index":2,"content_block":{"type":"tool_use","id":"toolu_01A","name":"search","input":{}}}

event: content_block_delta
data: {"type":"content_block_delta","index":2,"delta":{"type":"input_json_delta","partial_json":""}}

event: content_block_delta
data: {"type":"content_block_delta","index":2,"delta":{"type":"input_json_delta","partial_json":"{\"query\": \"fo"}}

event: content_block_delta
data: {"type":"content_block_delta","index":2,"delta":{"type":"input_json_delta","partial_json":"o\"}"}}

event: content_block_stop
data: {"type":"content_block_stop","index":2}

event: message_delta
data: {"type":"message_delta","delta":{"stop_reason":"tool_use","stop_sequence":null},"usage":{"output_tokens":40}}

event: message_stop
data: {"type":"message_stop"}

"#;

const FINAL_ROUND: &str = r#"event: message_start
data: {"type":"message_start","message":{"id":"msg_02","usage":{"input_tokens":200,"output_tokens":1}}}

event: content_block_start
data: {"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}

event: content_block_delta
data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":" Found it."}}

event: content_block_stop
data: {"type":"content_block_stop","index":0}

event: message_delta
data: {"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":10}}

event: message_stop
data: {"type":"message_stop"}
"#;

fn provider() -> Arc<AnthropicProvider> {
    Arc::new(AnthropicProvider::new(AnthropicConfig {
        api_key: "sk-ant-test".into(),
        ..Default::default()
    }))
}

fn payload() -> serde_json::Value {
    json!({
        "model": "claude-sonnet-4-5",
        "max_tokens": 1024,
        "stream": true,
        "messages": [{"role": "user", "content": "find foo"}],
    })
}

fn coordinator(
    transport: &Arc<MockTransport>,
) -> (
    Coordinator,
    tokio::sync::mpsc::UnboundedReceiver<SessionEvent>,
) {
    let mut tools = ToolRegistry::new();
    tools.register(echo_tool("search"));
    Coordinator::new(
        Arc::clone(transport) as Arc<dyn Transport>,
        tools,
        CoordinatorConfig::default(),
    )
}

#[tokio::test]
async fn test_tool_round_then_final_answer() {
    let transport = Arc::new(MockTransport::new());
    transport.queue_split(TOOL_ROUND, 17);
    transport.queue_split(FINAL_ROUND, 5);

    let (coordinator, mut events) = coordinator(&transport);
    coordinator
        .send(LlmRequest::new("req-1", provider(), payload()).with_tools(ToolFilter::All))
        .unwrap();
    let events = collect_until_terminal(&mut events).await;

    assert_eq!(partial_text(&events), "Searching now. Found it.");
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::ThinkingBlock { thinking, signature: Some(sig), .. }
            if thinking == "The user wants foo." && sig == "EqQBsig"
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::ToolExecutionCompleted { tool_id, result, .. }
            if tool_id == "toolu_01A" && result == r#"{"query":"foo"}"#
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::ContinuationStarted { round: 2, .. }
    )));
    match events.last() {
        Some(SessionEvent::Completed { usage, .. }) => {
            assert_eq!(usage.input_tokens, 320);
            assert_eq!(usage.output_tokens, 50);
        }
        other => panic!("expected Completed, got {other:?}"),
    }

    let sent = transport.recorded_requests();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].url, "https://api.anthropic.com/v1/messages");
    assert_eq!(sent[0].headers["x-api-key"], "sk-ant-test");
    let tools = json!([
        {"name": "search", "description": "test tool search", "input_schema": {"type": "object"}},
    ]);
    assert_eq!(sent[0].body["tools"], tools);
    assert_eq!(sent[1].body["tools"], tools);

    let history = sent[1].body["messages"].as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(
        history[1],
        json!({
            "role": "assistant",
            "content": [
                {"type": "thinking", "thinking": "The user wants foo.", "signature": "EqQBsig"},
                {"type": "text", "text": "Searching now."},
                {"type": "tool_use", "id": "toolu_01A", "name": "search", "input": {"query": "foo"}},
            ]
        })
    );
    assert_eq!(
        history[2],
        json!({
            "role": "user",
            "content": [
                {"type": "tool_result", "tool_use_id": "toolu_01A", "content": r#"{"query":"foo"}"#},
            ]
        })
    );
    assert_eq!(sent[1].body["max_tokens"], 1024);
}

#[tokio::test]
async fn test_unknown_tool_reported_to_model() {
    let transport = Arc::new(MockTransport::new());
    transport.queue_body(TOOL_ROUND.replace(r#""name":"search""#, r#""name":"lookup""#));
    transport.queue_body(FINAL_ROUND);

    let (coordinator, mut events) = coordinator(&transport);
    coordinator
        .send(LlmRequest::new("req-2", provider(), payload()))
        .unwrap();
    let events = collect_until_terminal(&mut events).await;
    assert!(matches!(events.last(), Some(SessionEvent::Completed { .. })));

    let sent = transport.recorded_requests();
    let result = &sent[1].body["messages"][2]["content"][0];
    assert_eq!(result["is_error"], true);
    assert!(
        result["content"]
            .as_str()
            .unwrap()
            .contains("Tool not found: lookup")
    );
}

#[tokio::test]
async fn test_in_band_error_fails_session() {
    let transport = Arc::new(MockTransport::new());
    transport.queue_body(concat!(
        "event: content_block_delta\n",
        r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hel"}}"#,
        "\n\nevent: error\n",
        r#"data: {"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        "\n\n",
    ));

    let (coordinator, mut events) = coordinator(&transport);
    coordinator
        .send(LlmRequest::new("req-3", provider(), payload()))
        .unwrap();
    let events = collect_until_terminal(&mut events).await;

    assert_eq!(partial_text(&events), "Hel");
    match events.last() {
        Some(SessionEvent::Failed { error, .. }) => assert!(error.contains("Overloaded")),
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, SessionEvent::FullResponse { .. }))
    );
}

#[tokio::test]
async fn test_refusal_fails_session() {
    let transport = Arc::new(MockTransport::new());
    transport.queue_body(concat!(
        r#"data: {"type":"message_delta","delta":{"stop_reason":"refusal"}}"#,
        "\n",
    ));

    let (coordinator, mut events) = coordinator(&transport);
    coordinator
        .send(LlmRequest::new("req-4", provider(), payload()))
        .unwrap();
    let events = collect_until_terminal(&mut events).await;
    assert!(matches!(events.last(), Some(SessionEvent::Failed { .. })));
}
