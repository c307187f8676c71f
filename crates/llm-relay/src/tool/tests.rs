use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::session::{RequestId, SessionEvent};
use crate::test_helpers::{
    ConcurrencyTracker, call, echo_tool, failing_tool, panicking_tool, pending_tool,
};

fn registry_with(handlers: Vec<Arc<dyn ToolHandler>>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for handler in handlers {
        registry.register_shared(handler);
    }
    registry
}

fn shared(handler: impl ToolHandler + 'static) -> Arc<dyn ToolHandler> {
    Arc::new(handler)
}

async fn drained(tools: &ToolOrchestrator, id: &RequestId) -> Vec<crate::message::ToolResult> {
    let rx = tools.completion(id).expect("queue should exist");
    tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("queue should drain")
        .expect("results should be delivered")
}

#[tokio::test]
async fn test_tools_run_in_order_without_overlap() {
    let tracker = ConcurrencyTracker::new();
    let registry = registry_with(vec![shared(tracker.tool("tracker", Duration::from_millis(20)))]);
    let tools = ToolOrchestrator::new(registry);
    let id = RequestId::from("req-1");

    let outcomes = tools.enqueue_all(
        &id,
        &CancellationToken::new(),
        [
            call("a", "tracker", json!({"tag": "A"})),
            call("b", "tracker", json!({"tag": "B"})),
            call("c", "tracker", json!({"tag": "C"})),
        ],
    );
    assert_eq!(outcomes, vec![EnqueueOutcome::Queued; 3]);

    let results = drained(&tools, &id).await;
    let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["a", "b", "c"]);
    assert_eq!(tracker.max_concurrent(), 1);
    assert_eq!(
        tracker.log(),
        ["start A", "end A", "start B", "end B", "start C", "end C"]
    );
}

#[tokio::test]
async fn test_enqueue_while_running_appends() {
    let tracker = ConcurrencyTracker::new();
    let registry = registry_with(vec![shared(tracker.tool("tracker", Duration::from_millis(30)))]);
    let tools = ToolOrchestrator::new(registry);
    let id = RequestId::from("req-1");

    tools.enqueue(&id, call("a", "tracker", json!({"tag": "A"})));
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(tools.executing(&id).as_deref(), Some("a"));
    tools.enqueue(&id, call("b", "tracker", json!({"tag": "B"})));

    let results = drained(&tools, &id).await;
    assert_eq!(results.len(), 2);
    assert_eq!(tracker.max_concurrent(), 1);
}

#[tokio::test]
async fn test_unknown_tool_is_an_error_result() {
    let tools = ToolOrchestrator::new(ToolRegistry::new());
    let id = RequestId::from("req-1");
    tools.enqueue(&id, call("t1", "nope", json!({})));

    let results = drained(&tools, &id).await;
    assert_eq!(results[0].content, "Error: Tool not found: nope");
    assert!(results[0].is_error);
}

#[tokio::test]
async fn test_failure_does_not_stop_queue() {
    let registry = registry_with(vec![
        shared(failing_tool("broken", "disk full")),
        shared(echo_tool("echo")),
    ]);
    let tools = ToolOrchestrator::new(registry);
    let id = RequestId::from("req-1");
    tools.enqueue_all(
        &id,
        &CancellationToken::new(),
        [
            call("t1", "broken", json!({})),
            call("t2", "echo", json!({"x": 1})),
        ],
    );

    let results = drained(&tools, &id).await;
    assert_eq!(results[0].content, "Error: disk full");
    assert!(results[0].is_error);
    assert_eq!(results[1].content, r#"{"x":1}"#);
    assert!(!results[1].is_error);
}

#[tokio::test]
async fn test_panicking_tool_is_an_error_result() {
    let registry = registry_with(vec![
        shared(panicking_tool("explode")),
        shared(echo_tool("echo")),
    ]);
    let tools = ToolOrchestrator::new(registry);
    let id = RequestId::from("req-1");
    tools.enqueue_all(
        &id,
        &CancellationToken::new(),
        [call("t1", "explode", json!({})), call("t2", "echo", json!({}))],
    );

    let results = drained(&tools, &id).await;
    assert_eq!(results.len(), 2);
    assert!(results[0].content.starts_with("Error: "));
    assert!(results[0].content.contains("panicked"));
    assert_eq!(results[1].content, "{}");
}

#[tokio::test]
async fn test_duplicate_ids_ignored() {
    let registry = registry_with(vec![shared(echo_tool("echo"))]);
    let tools = ToolOrchestrator::new(registry);
    let id = RequestId::from("req-1");

    let outcomes = tools.enqueue_all(
        &id,
        &CancellationToken::new(),
        [call("t1", "echo", json!({})), call("t1", "echo", json!({}))],
    );
    assert_eq!(
        outcomes,
        vec![EnqueueOutcome::Queued, EnqueueOutcome::Duplicate]
    );

    let results = drained(&tools, &id).await;
    assert_eq!(results.len(), 1);

    // Completed ids are remembered too.
    assert_eq!(
        tools.enqueue(&id, call("t1", "echo", json!({}))),
        EnqueueOutcome::Duplicate
    );
}

#[tokio::test]
async fn test_result_lookup() {
    let registry = registry_with(vec![shared(echo_tool("echo"))]);
    let tools = ToolOrchestrator::new(registry);
    let id = RequestId::from("req-1");
    tools.enqueue(&id, call("t1", "echo", json!({"k": "v"})));
    drained(&tools, &id).await;

    let result = tools.result(&id, "t1").unwrap();
    assert_eq!(result.content, r#"{"k":"v"}"#);
    assert!(tools.result(&id, "t2").is_none());
    assert!(tools.completion(&id).is_none(), "receiver is handed out once");
}

#[tokio::test]
async fn test_cleanup_is_idempotent() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let registry = registry_with(vec![shared(pending_tool("wait"))]);
    let tools = ToolOrchestrator::with_events(registry, tx);
    let id = RequestId::from("req-1");

    assert!(!tools.cleanup(&id));

    tools.enqueue_all(
        &id,
        &CancellationToken::new(),
        [call("t1", "wait", json!({})), call("t2", "wait", json!({}))],
    );
    let completion = tools.completion(&id).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(tools.executing(&id).as_deref(), Some("t1"));

    assert!(tools.cleanup(&id));
    assert!(!tools.cleanup(&id));
    assert!(!tools.has_queue(&id));

    // The handoff is dropped, never fulfilled.
    assert!(completion.await.is_err());

    tokio::time::sleep(Duration::from_millis(10)).await;
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(events.len(), 1, "only t1 started: {events:?}");
    assert!(matches!(
        &events[0],
        SessionEvent::ToolExecutionStarted { tool_id, .. } if tool_id == "t1"
    ));
}

#[tokio::test]
async fn test_cancelled_parent_rejects_enqueue() {
    let registry = registry_with(vec![shared(echo_tool("echo"))]);
    let tools = ToolOrchestrator::new(registry);
    let id = RequestId::from("req-1");
    let parent = CancellationToken::new();
    parent.cancel();

    let outcomes = tools.enqueue_all(&id, &parent, [call("t1", "echo", json!({}))]);
    assert_eq!(outcomes, vec![EnqueueOutcome::Rejected]);
    assert!(tools.executing(&id).is_none());
    assert!(!tools.has_queue(&id), "a rejected enqueue must not leave a queue behind");
    assert!(!tools.cleanup(&id));
}

#[tokio::test]
async fn test_request_id_reusable_after_rejected_enqueue() {
    let registry = registry_with(vec![shared(echo_tool("echo"))]);
    let tools = ToolOrchestrator::new(registry);
    let id = RequestId::from("req-1");
    let stale = CancellationToken::new();
    stale.cancel();
    tools.enqueue_all(&id, &stale, [call("t1", "echo", json!({}))]);

    let outcomes = tools.enqueue_all(
        &id,
        &CancellationToken::new(),
        [call("t1", "echo", json!({"again": true}))],
    );
    assert_eq!(outcomes, vec![EnqueueOutcome::Queued]);
    let results = drained(&tools, &id).await;
    assert_eq!(results[0].content, r#"{"again":true}"#);
    tools.cleanup(&id);
}

#[tokio::test]
async fn test_no_events_after_cleanup() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let registry = registry_with(vec![
        shared(echo_tool("echo")),
        shared(pending_tool("wait")),
    ]);
    let tools = ToolOrchestrator::with_events(registry, tx);
    let id = RequestId::from("req-1");
    tools.enqueue_all(
        &id,
        &CancellationToken::new(),
        [
            call("t1", "echo", json!({})),
            call("t2", "wait", json!({})),
            call("t3", "echo", json!({})),
        ],
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(tools.executing(&id).as_deref(), Some("t2"));

    assert!(tools.cleanup(&id));
    let mut before = Vec::new();
    while let Ok(event) = rx.try_recv() {
        before.push(event);
    }
    assert_eq!(before.len(), 3, "t1 start+done, t2 start: {before:?}");

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(rx.try_recv().is_err(), "tool events leaked past cleanup");
}

#[tokio::test]
async fn test_parent_cancellation_stops_queue() {
    let registry = registry_with(vec![shared(pending_tool("wait"))]);
    let tools = ToolOrchestrator::new(registry);
    let id = RequestId::from("req-1");
    let parent = CancellationToken::new();

    tools.enqueue_all(&id, &parent, [call("t1", "wait", json!({}))]);
    tokio::time::sleep(Duration::from_millis(10)).await;
    parent.cancel();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(tools.result(&id, "t1").is_none());
    assert_eq!(
        tools.enqueue(&id, call("t2", "wait", json!({}))),
        EnqueueOutcome::Rejected
    );
    assert!(tools.cleanup(&id));
}

#[tokio::test]
async fn test_requests_are_independent() {
    let registry = registry_with(vec![
        shared(pending_tool("wait")),
        shared(echo_tool("echo")),
    ]);
    let tools = ToolOrchestrator::new(registry);
    let stuck = RequestId::from("stuck");
    let free = RequestId::from("free");

    tools.enqueue(&stuck, call("t1", "wait", json!({})));
    tools.enqueue(&free, call("t1", "echo", json!({"ok": true})));

    let results = drained(&tools, &free).await;
    assert_eq!(results[0].content, r#"{"ok":true}"#);
    assert_eq!(tools.executing(&stuck).as_deref(), Some("t1"));
    tools.cleanup(&stuck);
}

#[tokio::test]
async fn test_events_use_display_name() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let registry = registry_with(vec![shared(
        echo_tool("echo").with_display_name("Echoing input"),
    )]);
    let tools = ToolOrchestrator::with_events(registry, tx);
    let id = RequestId::from("req-1");
    tools.enqueue_all(
        &id,
        &CancellationToken::new(),
        [call("t1", "echo", json!({})), call("t2", "echo", json!({}))],
    );
    drained(&tools, &id).await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    let summary: Vec<String> = events
        .iter()
        .map(|e| match e {
            SessionEvent::ToolExecutionStarted { tool_id, tool_name, .. } => {
                format!("start {tool_id} {tool_name}")
            }
            SessionEvent::ToolExecutionCompleted { tool_id, result, .. } => {
                format!("done {tool_id} {result}")
            }
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    assert_eq!(
        summary,
        [
            "start t1 Echoing input",
            "done t1 {}",
            "start t2 Echoing input",
            "done t2 {}"
        ]
    );
}

#[test]
fn test_registry_basics() {
    let mut registry = ToolRegistry::new();
    assert!(registry.is_empty());
    registry.register(echo_tool("b_echo"));
    registry.register(echo_tool("a_echo"));
    registry.register(echo_tool("a_echo"));
    assert_eq!(registry.len(), 2);
    assert!(registry.contains("a_echo"));
    assert!(registry.get("missing").is_none());
    let names: Vec<_> = registry.definitions().into_iter().map(|d| d.name).collect();
    assert_eq!(names, ["a_echo", "b_echo"]);
    assert!(format!("{registry:?}").contains("a_echo"));
}

#[test]
fn test_read_only_filter() {
    let mut registry = ToolRegistry::new();
    registry.register(echo_tool("read_file").read_only());
    registry.register(echo_tool("edit_file"));
    registry.register(echo_tool("list_files").read_only());

    let names = |filter| -> Vec<String> {
        registry
            .definitions_for(filter)
            .into_iter()
            .map(|d| d.name)
            .collect()
    };
    assert_eq!(names(ToolFilter::All), ["edit_file", "list_files", "read_file"]);
    assert_eq!(names(ToolFilter::ReadOnly), ["list_files", "read_file"]);
    assert!(registry.get("read_file").unwrap().is_read_only());
    assert!(!registry.get("edit_file").unwrap().is_read_only());
}

#[test]
fn test_tool_error_conversions() {
    let err = ToolError::from(std::io::Error::other("no such file"));
    assert_eq!(err.to_string(), "no such file");
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(ToolError::from(json_err).message.starts_with("invalid arguments"));
}
