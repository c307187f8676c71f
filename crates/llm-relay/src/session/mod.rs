//! The per-request state machine.
//!
//! A [`Coordinator`] owns every live session. [`Coordinator::send`]
//! spawns one task per request id that loops through rounds:
//!
//! ```text
//!   Sending ──► Streaming ──► Completed
//!      ▲            │
//!      │            ▼
//!      └──── ExecutingTools        (any phase) ──► Failed | Cancelled
//! ```
//!
//! Progress is reported as [`SessionEvent`]s on the receiver returned by
//! [`Coordinator::new`]. Every session ends with exactly one terminal
//! event, emitted after the session has been removed and its tool queue
//! cleaned up.

mod event;
mod runner;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span};

pub use event::{RequestId, SessionEvent};

use crate::error::LlmError;
use crate::framer::DEFAULT_MAX_BUFFER;
use crate::provider::Provider;
use crate::tool::{ToolFilter, ToolOrchestrator, ToolRegistry};
use crate::transport::Transport;
use crate::usage::Usage;
use runner::Session;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Posting the round's request.
    Sending,
    /// Reading the round's response stream.
    Streaming,
    /// Running the round's tool calls.
    ExecutingTools,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled by the caller.
    Cancelled,
}

impl Phase {
    /// Returns `true` for `Completed`, `Failed` and `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Limits applied to every session.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Maximum number of rounds (the first request plus continuations).
    pub max_rounds: u32,
    /// Maximum bytes the line framer may buffer without seeing a newline.
    pub max_buffer_bytes: usize,
    /// Longest gap allowed between two response chunks. `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_rounds: 25,
            max_buffer_bytes: DEFAULT_MAX_BUFFER,
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }
}

/// One logical exchange to start.
///
/// `payload` is the vendor-specific request body for the first round,
/// as produced by the caller's prompt templates.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Caller-chosen id; must not belong to a live session.
    pub request_id: RequestId,
    /// Streaming endpoint to post to.
    pub url: String,
    /// The first round's request body.
    pub payload: Value,
    /// The vendor the payload is written for.
    pub provider: Arc<dyn Provider>,
    /// Registered tools to offer in the payload's `tools` field. An
    /// existing `tools` field is never overwritten.
    pub tools: Option<ToolFilter>,
}

impl LlmRequest {
    /// Creates a request posting to the provider's default endpoint.
    pub fn new(request_id: impl Into<RequestId>, provider: Arc<dyn Provider>, payload: Value) -> Self {
        Self {
            request_id: request_id.into(),
            url: provider.endpoint_url(),
            payload,
            provider,
            tools: None,
        }
    }

    /// Offers the coordinator's registered tools admitted by `filter`.
    #[must_use]
    pub fn with_tools(mut self, filter: ToolFilter) -> Self {
        self.tools = Some(filter);
        self
    }

    /// Overrides the endpoint.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// State shared between a session's task and the coordinator.
pub(crate) struct SessionLink {
    request_id: RequestId,
    cancel: CancellationToken,
    phase: watch::Sender<Phase>,
    // Set once the terminal event went out; later events are dropped.
    closed: Mutex<bool>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionLink {
    fn closed(&self) -> MutexGuard<'_, bool> {
        self.closed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        let closed = self.closed();
        if !*closed {
            // A dropped receiver only means nobody is listening.
            let _ = self.events.send(event);
        }
    }

    pub(crate) fn set_phase(&self, next: Phase) {
        self.phase.send_if_modified(|phase| {
            if phase.is_terminal() || *phase == next {
                false
            } else {
                *phase = next;
                true
            }
        });
    }

    fn terminate(&self, phase: Phase, event: SessionEvent) {
        let mut closed = self.closed();
        if *closed {
            return;
        }
        *closed = true;
        let _ = self.events.send(event);
        self.phase.send_replace(phase);
    }
}

struct SessionEntry {
    seq: u64,
    link: Arc<SessionLink>,
}

struct Shared {
    transport: Arc<dyn Transport>,
    tools: ToolOrchestrator,
    config: CoordinatorConfig,
    events: mpsc::UnboundedSender<SessionEvent>,
    sessions: Mutex<HashMap<RequestId, SessionEntry>>,
    next_seq: AtomicU64,
}

impl Shared {
    fn sessions(&self) -> MutexGuard<'_, HashMap<RequestId, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes the entry if it still belongs to send number `seq`.
    fn claim(&self, request_id: &RequestId, seq: u64) -> bool {
        let mut sessions = self.sessions();
        if sessions.get(request_id).is_some_and(|e| e.seq == seq) {
            sessions.remove(request_id);
            true
        } else {
            false
        }
    }

    fn finish(&self, link: &SessionLink, seq: u64, outcome: Result<Usage, LlmError>) {
        if !self.claim(&link.request_id, seq) {
            // Cancelled concurrently; `cancel` emitted the terminal event.
            return;
        }
        self.tools.cleanup(&link.request_id);
        let request_id = link.request_id.clone();
        match outcome {
            Ok(usage) => {
                debug!(%request_id, "session completed");
                link.terminate(Phase::Completed, SessionEvent::Completed { request_id, usage });
            }
            Err(LlmError::Cancelled) => {
                link.terminate(Phase::Cancelled, SessionEvent::Cancelled { request_id });
            }
            Err(error) => {
                debug!(%request_id, %error, "session failed");
                link.terminate(
                    Phase::Failed,
                    SessionEvent::Failed {
                        request_id,
                        error: error.to_string(),
                    },
                );
            }
        }
    }
}

/// Runs streaming sessions keyed by [`RequestId`].
///
/// Cheap to clone; clones share sessions, tools and the event channel.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use llm_relay::session::{Coordinator, CoordinatorConfig, LlmRequest, SessionEvent};
/// use llm_relay::tool::ToolRegistry;
/// use llm_relay::transport::{HttpTransport, HttpTransportConfig};
/// # async fn example(provider: Arc<dyn llm_relay::Provider>) -> Result<(), llm_relay::LlmError> {
/// let transport = Arc::new(HttpTransport::new(HttpTransportConfig::default())?);
/// let (coordinator, mut events) =
///     Coordinator::new(transport, ToolRegistry::new(), CoordinatorConfig::default());
///
/// let payload = serde_json::json!({"messages": [{"role": "user", "content": "Hi"}]});
/// coordinator.send(LlmRequest::new("req-1", provider, payload))?;
///
/// while let Some(event) = events.recv().await {
///     if let SessionEvent::PartialResponse { text, .. } = &event {
///         print!("{text}");
///     }
///     if event.is_terminal() {
///         break;
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Coordinator {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("transport", &self.shared.transport)
            .field("tools", &self.shared.tools)
            .field("config", &self.shared.config)
            .field("active", &self.shared.sessions().len())
            .finish()
    }
}

impl Coordinator {
    /// Creates a coordinator and the receiver its sessions report on.
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: ToolRegistry,
        config: CoordinatorConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let tools = ToolOrchestrator::with_events(registry, events.clone());
        let coordinator = Self {
            shared: Arc::new(Shared {
                transport,
                tools,
                config,
                events,
                sessions: Mutex::new(HashMap::new()),
                next_seq: AtomicU64::new(0),
            }),
        };
        (coordinator, rx)
    }

    /// The orchestrator running this coordinator's tools.
    pub fn tools(&self) -> &ToolOrchestrator {
        &self.shared.tools
    }

    /// Starts a session. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidRequest`] if a session with the same id
    /// is still live.
    pub fn send(&self, request: LlmRequest) -> Result<(), LlmError> {
        let request_id = request.request_id.clone();
        let seq = self.shared.next_seq.fetch_add(1, Ordering::Relaxed);
        let (phase, _) = watch::channel(Phase::Sending);
        let link = Arc::new(SessionLink {
            request_id: request_id.clone(),
            cancel: CancellationToken::new(),
            phase,
            closed: Mutex::new(false),
            events: self.shared.events.clone(),
        });

        {
            let mut sessions = self.shared.sessions();
            if sessions.contains_key(&request_id) {
                return Err(LlmError::InvalidRequest(format!(
                    "request id '{request_id}' is already active"
                )));
            }
            sessions.insert(
                request_id.clone(),
                SessionEntry {
                    seq,
                    link: Arc::clone(&link),
                },
            );
        }

        debug!(%request_id, provider = %request.provider.metadata().name, url = %request.url, "session started");
        let shared = Arc::clone(&self.shared);
        let span = debug_span!("session", %request_id);
        tokio::spawn(
            async move {
                let cancel = link.cancel.clone();
                let session = Session::new(
                    request,
                    Arc::clone(&link),
                    Arc::clone(&shared.transport),
                    shared.tools.clone(),
                    shared.config.clone(),
                );
                let outcome = tokio::select! {
                    biased;
                    () = cancel.cancelled() => Err(LlmError::Cancelled),
                    outcome = session.run() => outcome,
                };
                shared.finish(&link, seq, outcome);
            }
            .instrument(span),
        );
        Ok(())
    }

    /// Cancels a live session.
    ///
    /// Aborts the in-flight request, stops its tools and emits
    /// [`SessionEvent::Cancelled`]. Returns `false` for unknown or
    /// finished ids.
    pub fn cancel(&self, request_id: &RequestId) -> bool {
        let Some(entry) = self.shared.sessions().remove(request_id) else {
            return false;
        };
        entry.link.cancel.cancel();
        self.shared.tools.cleanup(request_id);
        debug!(%request_id, "session cancelled");
        entry.link.terminate(
            Phase::Cancelled,
            SessionEvent::Cancelled {
                request_id: request_id.clone(),
            },
        );
        true
    }

    /// The current phase of a live session.
    pub fn phase(&self, request_id: &RequestId) -> Option<Phase> {
        let sessions = self.shared.sessions();
        Some(*sessions.get(request_id)?.link.phase.borrow())
    }

    /// Subscribes to a live session's phase changes, including its
    /// terminal phase.
    pub fn watch_phase(&self, request_id: &RequestId) -> Option<watch::Receiver<Phase>> {
        let sessions = self.shared.sessions();
        Some(sessions.get(request_id)?.link.phase.subscribe())
    }

    /// Whether a session with this id is live.
    pub fn is_active(&self, request_id: &RequestId) -> bool {
        self.shared.sessions().contains_key(request_id)
    }

    /// Ids of all live sessions, sorted.
    pub fn active_requests(&self) -> Vec<RequestId> {
        let mut ids: Vec<_> = self.shared.sessions().keys().cloned().collect();
        ids.sort();
        ids
    }
}
