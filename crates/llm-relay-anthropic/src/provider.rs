//! Anthropic `Provider` implementation.

use std::borrow::Cow;
use std::collections::HashSet;
use std::time::Duration;

use http::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use llm_relay::error::LlmError;
use llm_relay::message::{Message, ToolResult};
use llm_relay::provider::{Capability, Provider, ProviderMetadata};
use llm_relay::stream::StreamEvent;
use llm_relay::tool::ToolDefinition;
use serde_json::Value;

use crate::config::AnthropicConfig;
use crate::{convert, stream};

/// Claude Messages API provider.
///
/// The request payload must set `"stream": true`; its `messages` array
/// is extended with each continuation.
///
/// ```rust
/// use llm_relay::Provider;
/// use llm_relay_anthropic::{AnthropicConfig, AnthropicProvider};
///
/// let provider = AnthropicProvider::new(AnthropicConfig {
///     api_key: "sk-ant-...".into(),
///     ..Default::default()
/// });
/// assert_eq!(provider.endpoint_url(), "https://api.anthropic.com/v1/messages");
/// ```
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    config: AnthropicConfig,
}

impl AnthropicProvider {
    /// Create a provider from configuration.
    pub fn new(config: AnthropicConfig) -> Self {
        Self { config }
    }

    /// The provider's configuration.
    pub fn config(&self) -> &AnthropicConfig {
        &self.config
    }
}

impl Provider for AnthropicProvider {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: Cow::Borrowed("anthropic"),
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
        format!("{base}/v1/messages")
    }

    fn headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.config.api_key)
                .map_err(|_| LlmError::Auth("API key contains invalid header characters".into()))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(&self.config.api_version).map_err(|_| {
                LlmError::InvalidRequest("API version contains invalid header characters".into())
            })?,
        );
        if let Some(beta) = &self.config.beta {
            headers.insert(
                "anthropic-beta",
                HeaderValue::from_str(beta).map_err(|_| {
                    LlmError::InvalidRequest("beta flags contain invalid header characters".into())
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
