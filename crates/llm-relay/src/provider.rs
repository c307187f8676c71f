//! The vendor seam.
//!
//! A [`Provider`] knows one vendor's wire format in both directions: how
//! to turn a framed response line into [`StreamEvent`]s, how to write an
//! assistant turn plus tool results back into that vendor's request
//! history, and how to render tool definitions for its `tools` field. It performs no I/O; sessions do the HTTP through a
//! [`Transport`](crate::transport::Transport).
//!
//! The trait is object-safe and used as `Arc<dyn Provider>`.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::LlmError;
use crate::message::{Message, ToolResult};
use crate::stream::StreamEvent;
use crate::tool::{ToolDefinition, ToolFilter, ToolRegistry};

/// Descriptive information about a configured provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Provider name (e.g. `"anthropic"`, `"mistral"`).
    pub name: Cow<'static, str>,
    /// The model identifier.
    pub model: String,
    /// Feature flags the vendor supports.
    pub capabilities: HashSet<Capability>,
}

/// A feature that a provider may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Capability {
    /// Function/tool calling.
    Tools,
    /// Streamed reasoning output.
    Reasoning,
    /// Image input.
    Vision,
}

/// One vendor's stream parser and continuation serializer.
pub trait Provider: Send + Sync + fmt::Debug {
    /// Describes the provider.
    fn metadata(&self) -> ProviderMetadata;

    /// The default streaming endpoint for the configured model.
    fn endpoint_url(&self) -> String;

    /// Headers (auth, API version, content type) for every request.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Auth`] when the key cannot be encoded as a
    /// header value.
    fn headers(&self) -> Result<HeaderMap, LlmError>;

    /// Timeout for each round's request, overriding the transport's.
    fn request_timeout(&self) -> Option<Duration> {
        None
    }

    /// Parses one framed line.
    ///
    /// Must not fail: unparseable input becomes
    /// [`IgnoreReason::Malformed`](crate::stream::IgnoreReason::Malformed).
    fn parse_line(&self, line: &str) -> Vec<StreamEvent>;

    /// Whether a plain stop finish with tool calls present means the
    /// model is waiting for tool results.
    ///
    /// Vendors without a dedicated tool-call finish code return `true`.
    fn stop_implies_tool_use(&self) -> bool {
        false
    }

    /// The assistant-turn history entries for `message`.
    fn assistant_turn(&self, message: &Message) -> Vec<Value>;

    /// History entries carrying tool results, in the given order.
    fn tool_results(&self, results: &[ToolResult]) -> Vec<Value>;

    /// Renders `tools` in this vendor's request `tools` shape.
    fn tool_definitions(&self, tools: &[ToolDefinition]) -> Value;

    /// The `tools` value offering the registry's tools that `filter`
    /// admits.
    ///
    /// `None` when the provider lacks [`Capability::Tools`] or nothing
    /// passes the filter, in which case the field should be left out.
    fn tools_payload(&self, registry: &ToolRegistry, filter: ToolFilter) -> Option<Value> {
        let metadata = self.metadata();
        if !metadata.capabilities.contains(&Capability::Tools) {
            debug!(provider = %metadata.name, "provider has no tool support, offering none");
            return None;
        }
        let definitions = registry.definitions_for(filter);
        if definitions.is_empty() {
            return None;
        }
        Some(self.tool_definitions(&definitions))
    }

    /// The payload field holding the conversation history.
    fn history_field(&self) -> &'static str {
        "messages"
    }

    /// Builds the next round's payload.
    ///
    /// The default appends [`assistant_turn`](Self::assistant_turn) and
    /// then [`tool_results`](Self::tool_results) to the array under
    /// [`history_field`](Self::history_field), leaving every other field
    /// of `payload` untouched.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidRequest`] when `payload` has no history
    /// array.
    fn continuation(
        &self,
        payload: &Value,
        message: &Message,
        results: &[ToolResult],
    ) -> Result<Value, LlmError> {
        let field = self.history_field();
        let mut next = payload.clone();
        let history = next
            .get_mut(field)
            .and_then(Value::as_array_mut)
            .ok_or_else(|| {
                LlmError::InvalidRequest(format!(
                    "request payload has no `{field}` array to continue"
                ))
            })?;
        history.extend(self.assistant_turn(message));
        history.extend(self.tool_results(results));
        Ok(next)
    }
}
