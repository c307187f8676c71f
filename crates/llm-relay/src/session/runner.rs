//! One session's round loop.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, instrument, trace, warn};

use super::{CoordinatorConfig, LlmRequest, Phase, SessionEvent, SessionLink};
use crate::error::LlmError;
use crate::framer::LineFramer;
use crate::message::{ContentBlock, Message, MessageState, ToolCall};
use crate::provider::Provider;
use crate::stream::{IgnoreReason, StreamEvent};
use crate::tool::{EnqueueOutcome, ToolOrchestrator};
use crate::transport::{ByteStream, HttpRequest, Transport};
use crate::usage::Usage;

pub(super) struct Session {
    link: Arc<SessionLink>,
    transport: Arc<dyn Transport>,
    tools: ToolOrchestrator,
    config: CoordinatorConfig,
    provider: Arc<dyn Provider>,
    url: String,
    payload: Value,
    message: Message,
    /// Visible text across every round.
    text: String,
    usage: Usage,
    round: u32,
    /// Settled reasoning blocks of this round already reported.
    reasoning_reported: usize,
}

impl Session {
    pub(super) fn new(
        request: LlmRequest,
        link: Arc<SessionLink>,
        transport: Arc<dyn Transport>,
        tools: ToolOrchestrator,
        config: CoordinatorConfig,
    ) -> Self {
        let mut payload = request.payload;
        if let Some(filter) = request.tools
            && let Some(object) = payload.as_object_mut()
            && !object.contains_key("tools")
            && let Some(definitions) = request.provider.tools_payload(tools.registry(), filter)
        {
            object.insert("tools".into(), definitions);
        }
        Self {
            message: Message::for_provider(request.provider.as_ref()),
            link,
            transport,
            tools,
            config,
            provider: request.provider,
            url: request.url,
            payload,
            text: String::new(),
            usage: Usage::default(),
            round: 1,
            reasoning_reported: 0,
        }
    }

    /// Runs rounds until the model stops asking for tools.
    ///
    /// Returns the usage summed over all rounds.
    pub(super) async fn run(mut self) -> Result<Usage, LlmError> {
        loop {
            self.link.set_phase(Phase::Sending);
            let body = self.send_round().await?;

            self.link.set_phase(Phase::Streaming);
            let round_usage = self.stream_round(body).await?;
            self.usage += round_usage;

            if self.message.state() != MessageState::RequiresToolExecution {
                debug!(
                    rounds = self.round,
                    finish = ?self.message.finish_signal(),
                    "conversation turn finished"
                );
                self.link.emit(SessionEvent::FullResponse {
                    request_id: self.link.request_id().clone(),
                    text: std::mem::take(&mut self.text),
                });
                return Ok(std::mem::take(&mut self.usage));
            }

            if self.round >= self.config.max_rounds {
                return Err(LlmError::RoundLimitExceeded {
                    limit: self.config.max_rounds,
                });
            }

            self.link.set_phase(Phase::ExecutingTools);
            let results = self.execute_tools().await?;
            self.payload = self
                .provider
                .continuation(&self.payload, &self.message, &results)?;
            self.message.start_new_continuation();
            self.reasoning_reported = 0;
            self.round += 1;
            self.link.emit(SessionEvent::ContinuationStarted {
                request_id: self.link.request_id().clone(),
                round: self.round,
            });
        }
    }

    async fn send_round(&self) -> Result<ByteStream, LlmError> {
        let request = HttpRequest {
            url: self.url.clone(),
            headers: self.provider.headers()?,
            body: self.payload.clone(),
            timeout: self.provider.request_timeout(),
        };
        trace!(round = self.round, url = %request.url, "posting round");
        self.transport.post(&request).await
    }

    #[instrument(skip_all, fields(round = self.round))]
    async fn stream_round(&mut self, mut body: ByteStream) -> Result<Usage, LlmError> {
        let mut framer = LineFramer::with_max_buffer(self.config.max_buffer_bytes);
        let mut usage = Usage::default();

        while let Some(chunk) = next_chunk(&mut body, self.config.idle_timeout).await? {
            for line in framer.feed(&chunk)? {
                self.handle_line(&line, &mut usage)?;
            }
        }
        if let Some(line) = framer.finish() {
            self.handle_line(&line, &mut usage)?;
        }

        self.message.end_of_stream()?;
        self.report_settled_reasoning();
        debug!(state = ?self.message.state(), "stream closed");
        Ok(usage)
    }

    fn handle_line(&mut self, line: &str, usage: &mut Usage) -> Result<(), LlmError> {
        for event in self.provider.parse_line(line) {
            match event {
                StreamEvent::Ignored(IgnoreReason::Malformed(reason)) => {
                    warn!(%reason, line, "skipping malformed stream line");
                }
                StreamEvent::Ignored(reason) => {
                    trace!(?reason, "ignored stream line");
                }
                StreamEvent::Usage(snapshot) => usage.merge_snapshot(&snapshot),
                StreamEvent::TextDelta(text) => {
                    if !text.is_empty() {
                        self.text.push_str(&text);
                        self.link.emit(SessionEvent::PartialResponse {
                            request_id: self.link.request_id().clone(),
                            text: text.clone(),
                        });
                    }
                    self.message.apply(StreamEvent::TextDelta(text))?;
                }
                other => self.message.apply(other)?,
            }
        }
        self.report_settled_reasoning();
        Ok(())
    }

    fn report_settled_reasoning(&mut self) {
        let fresh: Vec<SessionEvent> = self
            .message
            .settled_reasoning()
            .skip(self.reasoning_reported)
            .filter_map(|block| match block {
                ContentBlock::Thinking { text, signature } if !text.trim().is_empty() => {
                    Some(SessionEvent::ThinkingBlock {
                        request_id: self.link.request_id().clone(),
                        thinking: text.clone(),
                        signature: signature.clone(),
                    })
                }
                ContentBlock::RedactedThinking(data) => Some(SessionEvent::RedactedThinkingBlock {
                    request_id: self.link.request_id().clone(),
                    data: data.clone(),
                }),
                _ => None,
            })
            .collect();
        self.reasoning_reported = self.message.settled_reasoning().count();
        for event in fresh {
            self.link.emit(event);
        }
    }

    async fn execute_tools(&self) -> Result<Vec<crate::message::ToolResult>, LlmError> {
        let request_id = self.link.request_id();
        let calls: Vec<ToolCall> = self.message.tool_calls().cloned().collect();
        debug!(round = self.round, tools = calls.len(), "executing tools");

        let outcomes = self
            .tools
            .enqueue_all(request_id, self.link.cancel_token(), calls);
        if !outcomes.is_empty()
            && outcomes
                .iter()
                .all(|outcome| *outcome == EnqueueOutcome::Rejected)
        {
            return Err(LlmError::Cancelled);
        }
        let completion = self.tools.completion(request_id).ok_or(LlmError::Cancelled)?;
        // The sender is dropped only when the queue is cleaned up.
        let results = completion.await.map_err(|_| LlmError::Cancelled)?;
        self.tools.cleanup(request_id);
        Ok(results)
    }
}

async fn next_chunk(
    body: &mut ByteStream,
    idle_timeout: Option<Duration>,
) -> Result<Option<Vec<u8>>, LlmError> {
    let next = match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, body.next())
            .await
            .map_err(|_| LlmError::Timeout {
                elapsed_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            })?,
        None => body.next().await,
    };
    next.transpose()
}
