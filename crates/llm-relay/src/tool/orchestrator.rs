//! Per-request sequential tool execution.
//!
//! Each request id owns at most one queue. A queue runs its tools one at
//! a time in FIFO order on a driver task; queues of different requests
//! run concurrently. When a queue empties, the collected
//! [`ToolResult`]s are delivered once through the receiver handed out by
//! [`ToolOrchestrator::completion`].
//!
//! Every queue carries a [`CancellationToken`]. [`ToolOrchestrator::cleanup`]
//! cancels it, aborting the running tool and discarding whatever is still
//! queued; nothing recorded after that point is ever reported.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::ToolRegistry;
use crate::message::{ToolCall, ToolResult};
use crate::session::{RequestId, SessionEvent};

/// What happened to a call handed to [`ToolOrchestrator::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Appended to the queue.
    Queued,
    /// A call with the same id is already queued, running or done.
    Duplicate,
    /// The owning request is already cancelled.
    Rejected,
}

struct ToolQueue {
    pending: VecDeque<ToolCall>,
    executing: Option<String>,
    completed: Vec<ToolResult>,
    completed_index: HashMap<String, usize>,
    cancel: CancellationToken,
    driving: bool,
    drained_tx: Option<oneshot::Sender<Vec<ToolResult>>>,
    drained_rx: Option<oneshot::Receiver<Vec<ToolResult>>>,
}

impl ToolQueue {
    fn new(cancel: CancellationToken) -> Self {
        let (drained_tx, drained_rx) = oneshot::channel();
        Self {
            pending: VecDeque::new(),
            executing: None,
            completed: Vec::new(),
            completed_index: HashMap::new(),
            cancel,
            driving: false,
            drained_tx: Some(drained_tx),
            drained_rx: Some(drained_rx),
        }
    }

    fn knows(&self, id: &str) -> bool {
        self.executing.as_deref() == Some(id)
            || self.completed_index.contains_key(id)
            || self.pending.iter().any(|call| call.id == id)
    }
}

struct Inner {
    registry: ToolRegistry,
    queues: Mutex<HashMap<RequestId, ToolQueue>>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

/// Runs tool calls sequentially per request.
///
/// Cheap to clone; clones share queues.
///
/// ```rust
/// use llm_relay::message::ToolCall;
/// use llm_relay::session::RequestId;
/// use llm_relay::tool::{tool_fn, EnqueueOutcome, ToolDefinition, ToolOrchestrator, ToolRegistry};
/// use serde_json::{json, Value};
///
/// # async fn example() {
/// let mut registry = ToolRegistry::new();
/// registry.register(tool_fn(
///     ToolDefinition {
///         name: "echo".into(),
///         description: "Echo the input".into(),
///         parameters: json!({"type": "object"}),
///     },
///     |input: Value| async move { Ok(input.to_string()) },
/// ));
/// let tools = ToolOrchestrator::new(registry);
/// let id = RequestId::from("req-1");
///
/// let call = ToolCall { id: "t1".into(), name: "echo".into(), input: json!({"x": 1}) };
/// assert_eq!(tools.enqueue(&id, call), EnqueueOutcome::Queued);
///
/// let results = tools.completion(&id).unwrap().await.unwrap();
/// assert_eq!(results[0].content, r#"{"x":1}"#);
/// tools.cleanup(&id);
/// # }
/// ```
#[derive(Clone)]
pub struct ToolOrchestrator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ToolOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolOrchestrator")
            .field("registry", &self.inner.registry)
            .field("queues", &self.lock().len())
            .finish()
    }
}

impl ToolOrchestrator {
    /// Creates an orchestrator dispatching to `registry`.
    pub fn new(registry: ToolRegistry) -> Self {
        Self::build(registry, None)
    }

    /// Creates an orchestrator that reports tool start and completion
    /// on `events`.
    pub fn with_events(
        registry: ToolRegistry,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self::build(registry, Some(events))
    }

    fn build(
        registry: ToolRegistry,
        events: Option<mpsc::UnboundedSender<SessionEvent>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                queues: Mutex::new(HashMap::new()),
                events,
            }),
        }
    }

    /// The registry tools are dispatched to.
    pub fn registry(&self) -> &ToolRegistry {
        &self.inner.registry
    }

    /// Queues one call for `request_id`.
    ///
    /// Starts the queue's driver if nothing is running. Must be called
    /// from within a Tokio runtime.
    pub fn enqueue(&self, request_id: &RequestId, call: ToolCall) -> EnqueueOutcome {
        self.enqueue_all(request_id, &CancellationToken::new(), [call])
            .pop()
            .unwrap_or(EnqueueOutcome::Rejected)
    }

    /// Queues several calls atomically, in order.
    ///
    /// A new queue's token is a child of `parent`, so cancelling the
    /// owning session cancels its tools. Nothing is queued once `parent`
    /// is cancelled. Must be called from within a Tokio runtime.
    pub fn enqueue_all(
        &self,
        request_id: &RequestId,
        parent: &CancellationToken,
        calls: impl IntoIterator<Item = ToolCall>,
    ) -> Vec<EnqueueOutcome> {
        let mut queues = self.lock();
        if parent.is_cancelled() {
            debug!(%request_id, "rejecting tool calls for cancelled request");
            return calls.into_iter().map(|_| EnqueueOutcome::Rejected).collect();
        }
        let queue = queues
            .entry(request_id.clone())
            .or_insert_with(|| ToolQueue::new(parent.child_token()));

        let rejected = queue.cancel.is_cancelled();
        let outcomes = calls
            .into_iter()
            .map(|call| {
                if rejected {
                    EnqueueOutcome::Rejected
                } else if queue.knows(&call.id) {
                    debug!(%request_id, tool_id = %call.id, "ignoring duplicate tool call");
                    EnqueueOutcome::Duplicate
                } else {
                    debug!(%request_id, tool_id = %call.id, tool = %call.name, "tool queued");
                    queue.pending.push_back(call);
                    EnqueueOutcome::Queued
                }
            })
            .collect();

        // An idle driver is started even with nothing new queued so the
        // completion receiver always resolves.
        if !rejected && !queue.driving {
            if queue.drained_tx.is_none() {
                // Results were already delivered once; start a fresh handoff.
                let (tx, rx) = oneshot::channel();
                queue.drained_tx = Some(tx);
                queue.drained_rx = Some(rx);
            }
            queue.driving = true;
            tokio::spawn(self.clone().drive(request_id.clone()));
        }

        outcomes
    }

    /// Takes the receiver that yields the queue's results once it drains.
    ///
    /// Returns `None` if no queue exists or the receiver was already taken.
    pub fn completion(
        &self,
        request_id: &RequestId,
    ) -> Option<oneshot::Receiver<Vec<ToolResult>>> {
        self.lock().get_mut(request_id)?.drained_rx.take()
    }

    /// Looks up a finished call's result.
    pub fn result(&self, request_id: &RequestId, tool_id: &str) -> Option<ToolResult> {
        let queues = self.lock();
        let queue = queues.get(request_id)?;
        let index = *queue.completed_index.get(tool_id)?;
        queue.completed.get(index).cloned()
    }

    /// The id of the call currently running for `request_id`.
    pub fn executing(&self, request_id: &RequestId) -> Option<String> {
        self.lock().get(request_id)?.executing.clone()
    }

    /// Whether a queue exists for `request_id`.
    pub fn has_queue(&self, request_id: &RequestId) -> bool {
        self.lock().contains_key(request_id)
    }

    /// Cancels and removes the queue for `request_id`.
    ///
    /// Returns `false` (and does nothing) when no queue exists, so it is
    /// safe to call more than once.
    pub fn cleanup(&self, request_id: &RequestId) -> bool {
        let Some(queue) = self.lock().remove(request_id) else {
            return false;
        };
        queue.cancel.cancel();
        debug!(
            %request_id,
            discarded = queue.pending.len(),
            running = queue.executing.is_some(),
            "tool queue cleaned up"
        );
        true
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, ToolQueue>> {
        self.inner
            .queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // Callers hold the queue lock and have checked the queue's token, so
    // an event is never sent once cleanup has cancelled the queue.
    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.inner.events {
            // A dropped receiver only means nobody is listening.
            let _ = events.send(event);
        }
    }

    fn report_started(
        &self,
        request_id: &RequestId,
        cancel: &CancellationToken,
        tool_id: &str,
        tool_name: &str,
    ) -> bool {
        let _queues = self.lock();
        if cancel.is_cancelled() {
            return false;
        }
        self.emit(SessionEvent::ToolExecutionStarted {
            request_id: request_id.clone(),
            tool_id: tool_id.to_string(),
            tool_name: tool_name.to_string(),
        });
        true
    }

    async fn drive(self, request_id: RequestId) {
        while let Some((call, cancel)) = self.next_call(&request_id) {
            let handler = self.inner.registry.get(&call.name).cloned();
            let tool_name = handler
                .as_ref()
                .map_or_else(|| call.name.clone(), |h| h.display_name());

            if !self.report_started(&request_id, &cancel, &call.id, &tool_name) {
                return;
            }

            let outcome = match handler {
                None => Err(format!("Tool not found: {}", call.name)),
                Some(handler) => {
                    let input = call.input.clone();
                    let mut task = tokio::spawn(async move { handler.execute(input).await });
                    tokio::select! {
                        () = cancel.cancelled() => {
                            task.abort();
                            debug!(%request_id, tool_id = %call.id, "tool aborted");
                            return;
                        }
                        joined = &mut task => match joined {
                            Ok(Ok(output)) => Ok(output.content),
                            Ok(Err(e)) => Err(e.message),
                            Err(e) if e.is_panic() => Err(format!("tool {} panicked", call.name)),
                            Err(e) => Err(e.to_string()),
                        },
                    }
                }
            };

            let result = match outcome {
                Ok(content) => ToolResult {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    content,
                    is_error: false,
                },
                Err(message) => {
                    warn!(%request_id, tool_id = %call.id, tool = %call.name, error = %message, "tool failed");
                    ToolResult {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        content: format!("Error: {message}"),
                        is_error: true,
                    }
                }
            };

            if !self.record(&request_id, &cancel, tool_name, result) {
                return;
            }
        }
    }

    fn next_call(&self, request_id: &RequestId) -> Option<(ToolCall, CancellationToken)> {
        let mut queues = self.lock();
        let queue = queues.get_mut(request_id)?;
        if queue.cancel.is_cancelled() {
            queue.driving = false;
            return None;
        }
        if let Some(call) = queue.pending.pop_front() {
            queue.executing = Some(call.id.clone());
            return Some((call, queue.cancel.clone()));
        }

        queue.executing = None;
        queue.driving = false;
        if let Some(tx) = queue.drained_tx.take() {
            debug!(%request_id, completed = queue.completed.len(), "tool queue drained");
            // The receiver may be gone if the session already ended.
            let _ = tx.send(queue.completed.clone());
        }
        None
    }

    fn record(
        &self,
        request_id: &RequestId,
        cancel: &CancellationToken,
        tool_name: String,
        result: ToolResult,
    ) -> bool {
        let mut queues = self.lock();
        if cancel.is_cancelled() {
            return false;
        }
        let Some(queue) = queues.get_mut(request_id) else {
            return false;
        };
        self.emit(SessionEvent::ToolExecutionCompleted {
            request_id: request_id.clone(),
            tool_id: result.id.clone(),
            tool_name,
            result: result.content.clone(),
        });
        queue.executing = None;
        queue
            .completed_index
            .insert(result.id.clone(), queue.completed.len());
        queue.completed.push(result);
        true
    }
}
