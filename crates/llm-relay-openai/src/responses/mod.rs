//! `OpenAI` Responses API provider.
//!
//! History lives in the payload's `input` array. An assistant turn is an
//! `assistant` message (when the round produced text) followed by one
//! `function_call` item per call; results are `function_call_output`
//! items. The API has no tool-call finish code, so a completed response
//! holding calls requires tool execution.

mod stream;
mod types;

use std::borrow::Cow;
use std::collections::HashSet;
use std::time::Duration;

use http::HeaderMap;
use llm_relay::error::LlmError;
use llm_relay::message::{Message, ToolResult};
use llm_relay::provider::{Capability, Provider, ProviderMetadata};
use llm_relay::stream::StreamEvent;
use llm_relay::tool::ToolDefinition;
use serde_json::Value;
use tracing::warn;

use self::types::{FunctionTool, InputItem, TypedItem};
use crate::config::ResponsesConfig;
use crate::provider::bearer_headers;

/// Responses API provider.
///
/// ```rust
/// use llm_relay::Provider;
/// use llm_relay_openai::{ResponsesConfig, ResponsesProvider};
///
/// let provider = ResponsesProvider::new(ResponsesConfig::default());
/// assert_eq!(provider.history_field(), "input");
/// assert!(provider.stop_implies_tool_use());
/// ```
#[derive(Debug, Clone)]
pub struct ResponsesProvider {
    config: ResponsesConfig,
}

impl ResponsesProvider {
    /// Create a provider from configuration.
    pub fn new(config: ResponsesConfig) -> Self {
        Self { config }
    }

    /// The provider's configuration.
    pub fn config(&self) -> &ResponsesConfig {
        &self.config
    }
}

fn to_values(items: &[InputItem]) -> Vec<Value> {
    items
        .iter()
        .filter_map(|item| {
            serde_json::to_value(item)
                .inspect_err(|e| warn!(error = %e, "failed to serialize Responses input item"))
                .ok()
        })
        .collect()
}

impl Provider for ResponsesProvider {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: Cow::Borrowed("openai-responses"),
            model: self.config.model.clone(),
            capabilities: HashSet::from([
                Capability::Tools,
                Capability::Reasoning,
                Capability::Vision,
            ]),
        }
    }

    fn endpoint_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/responses")
    }

    fn headers(&self) -> Result<HeaderMap, LlmError> {
        bearer_headers(&self.config.api_key, self.config.organization.as_deref())
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.config.timeout
    }

    fn parse_line(&self, line: &str) -> Vec<StreamEvent> {
        stream::parse_line(line)
    }

    fn stop_implies_tool_use(&self) -> bool {
        true
    }

    fn assistant_turn(&self, message: &Message) -> Vec<Value> {
        let mut items = Vec::new();
        let text = message.text();
        if !text.is_empty() {
            items.push(InputItem::Message {
                role: "assistant",
                content: text,
            });
        }
        items.extend(message.tool_calls().map(|call| {
            InputItem::Typed(TypedItem::FunctionCall {
                call_id: call.id.clone(),
                name: call.name.clone(),
                arguments: call.input.to_string(),
            })
        }));
        to_values(&items)
    }

    fn tool_results(&self, results: &[ToolResult]) -> Vec<Value> {
        let items: Vec<InputItem> = results
            .iter()
            .map(|result| {
                InputItem::Typed(TypedItem::FunctionCallOutput {
                    call_id: result.id.clone(),
                    output: result.content.clone(),
                })
            })
            .collect();
        to_values(&items)
    }

    fn tool_definitions(&self, tools: &[ToolDefinition]) -> Value {
        let tools: Vec<FunctionTool<'_>> = tools
            .iter()
            .map(|t| FunctionTool {
                tool_type: "function",
                name: &t.name,
                description: &t.description,
                parameters: &t.parameters,
            })
            .collect();
        serde_json::to_value(tools)
            .inspect_err(|e| warn!(error = %e, "failed to serialize Responses tool definitions"))
            .unwrap_or_else(|_| Value::Array(Vec::new()))
    }

    fn history_field(&self) -> &'static str {
        "input"
    }
}
