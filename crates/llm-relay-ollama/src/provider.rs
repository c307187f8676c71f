//! Ollama `Provider` implementation.

use std::borrow::Cow;
use std::collections::HashSet;
use std::time::Duration;

use http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use llm_relay::error::LlmError;
use llm_relay::message::{Message, ToolResult};
use llm_relay::provider::{Capability, Provider, ProviderMetadata};
use llm_relay::stream::StreamEvent;
use llm_relay::tool::ToolDefinition;
use serde_json::Value;

use crate::config::OllamaConfig;
use crate::{convert, stream};

/// Provider for a local (or proxied) Ollama server's `/api/chat`.
///
/// Ollama has no tool-call finish code: a `stop` with tool calls
/// present requires tool execution.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Create a provider from configuration.
    pub fn new(config: OllamaConfig) -> Self {
        Self { config }
    }

    /// The provider's configuration.
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }
}

impl Provider for OllamaProvider {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: Cow::Borrowed("ollama"),
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
        format!("{base}/api/chat")
    }

    fn headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| {
                    LlmError::Auth("API key contains invalid header characters".into())
                })?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
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
        convert::assistant_turn(message)
    }

    fn tool_results(&self, results: &[ToolResult]) -> Vec<Value> {
        convert::tool_results(results)
    }

    fn tool_definitions(&self, tools: &[ToolDefinition]) -> Value {
        convert::tool_definitions(tools)
    }
}
