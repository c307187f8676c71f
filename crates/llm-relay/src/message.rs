//! The normalized per-round assistant message.
//!
//! A [`Message`] is built by applying [`StreamEvent`]s in arrival order.
//! It owns everything that belongs to one round: content blocks, open
//! tool-call argument buffers, the alias table mapping stream indices or
//! item ids to call ids, and the vendor's finish code. All of it is
//! discarded by [`Message::start_new_continuation`].
//!
//! ```rust
//! use llm_relay::message::{Message, MessageState};
//! use llm_relay::stream::{FinishReason, StreamEvent};
//!
//! let mut message = Message::new();
//! message.apply(StreamEvent::TextDelta("Hi ".into())).unwrap();
//! message.apply(StreamEvent::TextDelta("there".into())).unwrap();
//! message.apply(StreamEvent::finish(FinishReason::Stop, "stop")).unwrap();
//!
//! assert_eq!(message.text(), "Hi there");
//! assert_eq!(message.blocks().len(), 1);
//! assert_eq!(message.state(), MessageState::Complete);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::error::LlmError;
use crate::provider::Provider;
use crate::stream::{FinishReason, StreamEvent, ToolKey};

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Vendor-assigned id, unique within the round.
    pub id: String,
    /// The tool's registered name.
    pub name: String,
    /// Parsed arguments; always a JSON object.
    pub input: Value,
}

/// The outcome of one tool invocation, sent back on continuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The id of the [`ToolCall`] this answers.
    pub id: String,
    /// The tool's registered name (Gemini keys results by name).
    pub name: String,
    /// Output text, or `"Error: ..."` on failure.
    pub content: String,
    /// Whether the tool failed.
    pub is_error: bool,
}

/// A typed fragment of an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentBlock {
    /// Visible text.
    Text(String),
    /// A reasoning trace and the signature that authenticates it.
    Thinking {
        /// The reasoning text.
        text: String,
        /// Opaque provenance token, echoed back verbatim.
        signature: Option<String>,
    },
    /// An encrypted reasoning block, echoed back verbatim.
    RedactedThinking(String),
    /// A tool invocation.
    ToolUse(ToolCall),
    /// A tool outcome. Only produced when serializing continuations.
    ToolResult(ToolResult),
}

/// Where a round's message stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageState {
    /// Events are still arriving.
    Building,
    /// The model wants tool results before it continues.
    RequiresToolExecution,
    /// The turn ended.
    Complete,
    /// The conversation ended.
    Final,
}

impl MessageState {
    /// Returns `true` once the round needs no further input.
    pub fn is_done(self) -> bool {
        matches!(self, Self::Complete | Self::Final)
    }
}

#[derive(Debug)]
struct OpenCall {
    id: String,
    arguments: String,
}

/// The assistant message of one round.
#[derive(Debug)]
pub struct Message {
    blocks: Vec<ContentBlock>,
    state: MessageState,
    finish_signal: Option<String>,
    open_calls: Vec<OpenCall>,
    aliases: HashMap<ToolKey, String>,
    stop_implies_tool_use: bool,
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl Message {
    /// Creates an empty message in the `Building` state.
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            state: MessageState::Building,
            finish_signal: None,
            open_calls: Vec::new(),
            aliases: HashMap::new(),
            stop_implies_tool_use: false,
        }
    }

    /// Creates a message for a vendor whose plain stop codes also end
    /// tool-calling turns (see [`Provider::stop_implies_tool_use`]).
    pub fn for_provider(provider: &dyn Provider) -> Self {
        Self {
            stop_implies_tool_use: provider.stop_implies_tool_use(),
            ..Self::new()
        }
    }

    /// Applies one event.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Provider`] when the event is an in-band vendor
    /// error or a finish with [`FinishReason::ErrorLike`]. The message is
    /// left as it was; the caller is expected to abandon the round.
    pub fn apply(&mut self, event: StreamEvent) -> Result<(), LlmError> {
        match event {
            StreamEvent::TextDelta(text) => self.push_text(&text),
            StreamEvent::ThinkingDelta(text) => self.push_thinking(&text),
            StreamEvent::ThinkingSignature(signature) => self.attach_signature(signature),
            StreamEvent::RedactedThinking(data) => {
                self.blocks.push(ContentBlock::RedactedThinking(data));
            }
            StreamEvent::ToolCallStart { id, name, key } => self.start_call(id, name, key),
            StreamEvent::ToolCallArgsDelta { key, fragment } => self.append_arguments(&key, &fragment),
            StreamEvent::ToolCallDone { key } => self.close_call(&key),
            StreamEvent::Finish {
                reason,
                raw,
                conversation_over,
            } => return self.finish(reason, raw, conversation_over),
            StreamEvent::Error { code, message } => return Err(LlmError::provider(code, message)),
            StreamEvent::Usage(_) | StreamEvent::Ignored(_) => {}
        }
        Ok(())
    }

    /// Settles a round whose stream closed without a finish event.
    ///
    /// Open calls are closed. A still-`Building` message without tool
    /// calls becomes `Complete`; one holding tool calls requires their
    /// execution when the vendor's stop codes imply tool use.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ResponseFormat`] when the stream was cut off
    /// after tool calls from a vendor that always sends a tool-call
    /// finish code.
    pub fn end_of_stream(&mut self) -> Result<(), LlmError> {
        self.close_all_calls();
        if self.state != MessageState::Building {
            return Ok(());
        }
        if !self.has_tool_calls() {
            debug!("stream ended without a finish signal, treating round as complete");
            self.state = MessageState::Complete;
        } else if self.stop_implies_tool_use {
            debug!("stream ended without a finish signal after tool calls");
            self.state = MessageState::RequiresToolExecution;
        } else {
            return Err(LlmError::ResponseFormat {
                message: "stream ended after tool calls without a finish signal".into(),
                raw: String::new(),
            });
        }
        Ok(())
    }

    /// Content blocks in arrival order.
    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    /// The message's current state.
    pub fn state(&self) -> MessageState {
        self.state
    }

    /// The vendor's raw finish code, once one arrived.
    pub fn finish_signal(&self) -> Option<&str> {
        self.finish_signal.as_deref()
    }

    /// All visible text, concatenated.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Tool calls in the order the model issued them.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.blocks.iter().filter_map(|b| match b {
            ContentBlock::ToolUse(call) => Some(call),
            _ => None,
        })
    }

    /// Returns `true` if the message holds at least one tool call.
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls().next().is_some()
    }

    /// Reasoning blocks (plain or redacted) that can no longer grow.
    ///
    /// A reasoning block is settled once any block follows it, or once
    /// the message has left `Building`. Settled blocks always form a
    /// prefix of all reasoning blocks, so callers can track what they
    /// already reported with a plain counter.
    pub fn settled_reasoning(&self) -> impl Iterator<Item = &ContentBlock> {
        let settled_len = if self.state == MessageState::Building {
            self.blocks.len().saturating_sub(1)
        } else {
            self.blocks.len()
        };
        self.blocks[..settled_len].iter().filter(|b| {
            matches!(
                b,
                ContentBlock::Thinking { .. } | ContentBlock::RedactedThinking(_)
            )
        })
    }

    /// Serializes the assistant turn in the vendor's history format.
    pub fn to_provider_format(&self, provider: &dyn Provider) -> Vec<Value> {
        provider.assistant_turn(self)
    }

    /// Resets the message for the next round.
    pub fn start_new_continuation(&mut self) {
        self.blocks.clear();
        self.state = MessageState::Building;
        self.finish_signal = None;
        self.open_calls.clear();
        self.aliases.clear();
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(ContentBlock::Text(current)) = self.blocks.last_mut() {
            current.push_str(text);
        } else {
            self.blocks.push(ContentBlock::Text(text.to_string()));
        }
    }

    fn push_thinking(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        // A signed block is closed; new reasoning opens another one.
        if let Some(ContentBlock::Thinking {
            text: current,
            signature: None,
        }) = self.blocks.last_mut()
        {
            current.push_str(text);
        } else {
            self.blocks.push(ContentBlock::Thinking {
                text: text.to_string(),
                signature: None,
            });
        }
    }

    fn attach_signature(&mut self, signature: String) {
        let latest = self
            .blocks
            .iter_mut()
            .rev()
            .find_map(|b| match b {
                ContentBlock::Thinking { signature, .. } => Some(signature),
                _ => None,
            });
        match latest {
            Some(slot) => *slot = Some(signature),
            None => self.blocks.push(ContentBlock::Thinking {
                text: String::new(),
                signature: Some(signature),
            }),
        }
    }

    fn start_call(&mut self, id: String, name: String, key: Option<ToolKey>) {
        if self.tool_calls().any(|call| call.id == id) {
            debug!(tool_id = %id, "ignoring duplicate tool call start");
            return;
        }
        trace!(tool_id = %id, tool = %name, "tool call started");
        if let Some(key) = key {
            self.aliases.insert(key, id.clone());
        }
        self.open_calls.push(OpenCall {
            id: id.clone(),
            arguments: String::new(),
        });
        self.blocks.push(ContentBlock::ToolUse(ToolCall {
            id,
            name,
            input: Value::Object(Map::new()),
        }));
    }

    fn resolve<'a>(&'a self, key: &'a ToolKey) -> Option<&'a str> {
        match key {
            ToolKey::Id(id) => Some(id.as_str()),
            other => self.aliases.get(other).map(String::as_str),
        }
    }

    fn append_arguments(&mut self, key: &ToolKey, fragment: &str) {
        let Some(id) = self.resolve(key).map(str::to_string) else {
            trace!(?key, "argument fragment for unknown tool call");
            return;
        };
        match self.open_calls.iter_mut().find(|c| c.id == id) {
            Some(call) => call.arguments.push_str(fragment),
            None => trace!(tool_id = %id, "argument fragment after tool call closed"),
        }
    }

    fn close_call(&mut self, key: &ToolKey) {
        let Some(id) = self.resolve(key).map(str::to_string) else {
            trace!(?key, "close for unknown tool call");
            return;
        };
        let Some(pos) = self.open_calls.iter().position(|c| c.id == id) else {
            return;
        };
        let call = self.open_calls.remove(pos);
        self.settle_call(call);
    }

    fn close_all_calls(&mut self) {
        for call in std::mem::take(&mut self.open_calls) {
            self.settle_call(call);
        }
    }

    fn settle_call(&mut self, call: OpenCall) {
        let input = parse_arguments(&call.id, &call.arguments);
        for block in &mut self.blocks {
            if let ContentBlock::ToolUse(tool) = block
                && tool.id == call.id
            {
                tool.input = input;
                return;
            }
        }
    }

    fn finish(
        &mut self,
        reason: FinishReason,
        raw: String,
        conversation_over: bool,
    ) -> Result<(), LlmError> {
        if self.state != MessageState::Building {
            debug!(finish = %raw, "ignoring finish signal for settled round");
            return Ok(());
        }
        if let FinishReason::ErrorLike(message) = reason {
            return Err(LlmError::provider(raw, message));
        }

        self.close_all_calls();
        self.finish_signal = Some(raw.clone());

        let has_tools = self.has_tool_calls();
        self.state = match reason {
            FinishReason::ToolCalls if has_tools => MessageState::RequiresToolExecution,
            FinishReason::ToolCalls => {
                warn!(finish = %raw, "tool-call finish without any tool calls");
                MessageState::Complete
            }
            _ if has_tools && self.stop_implies_tool_use => MessageState::RequiresToolExecution,
            _ if conversation_over => MessageState::Final,
            _ => MessageState::Complete,
        };
        Ok(())
    }
}

/// Parses accumulated tool arguments, falling back to `{}`.
fn parse_arguments(id: &str, raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return Value::Object(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) => {
            warn!(tool_id = %id, "tool arguments are not a JSON object, using {{}}");
            Value::Object(Map::new())
        }
        Err(e) => {
            warn!(tool_id = %id, error = %e, "tool arguments are not valid JSON, using {{}}");
            Value::Object(Map::new())
        }
    }
}
