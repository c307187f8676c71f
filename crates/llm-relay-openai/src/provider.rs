//! Chat Completions `Provider` implementation.

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

use crate::config::{OpenAiConfig, OpenAiFlavor};
use crate::{convert, stream};

/// Chat Completions provider for `OpenAI` and compatible servers.
///
/// The request payload should set `"stream": true` and, to receive
/// token counts, `"stream_options": {"include_usage": true}`.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create a provider from configuration.
    pub fn new(config: OpenAiConfig) -> Self {
        Self { config }
    }

    /// The provider's configuration.
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }
}

/// `Authorization` (when a key is set), `OpenAI-Organization` (when set)
/// and `Content-Type`.
pub(crate) fn bearer_headers(
    api_key: &str,
    organization: Option<&str>,
) -> Result<HeaderMap, LlmError> {
    let mut headers = HeaderMap::new();
    if !api_key.is_empty() {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|_| LlmError::Auth("API key contains invalid header characters".into()))?,
        );
    }
    if let Some(organization) = organization {
        headers.insert(
            "OpenAI-Organization",
            HeaderValue::from_str(organization).map_err(|_| {
                LlmError::InvalidRequest("organization contains invalid header characters".into())
            })?,
        );
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

impl Provider for OpenAiProvider {
    fn metadata(&self) -> ProviderMetadata {
        let mut capabilities = HashSet::from([Capability::Tools, Capability::Reasoning]);
        if matches!(
            self.config.flavor,
            OpenAiFlavor::OpenAi | OpenAiFlavor::Mistral | OpenAiFlavor::OpenRouter
        ) {
            capabilities.insert(Capability::Vision);
        }
        ProviderMetadata {
            name: Cow::Borrowed(self.config.flavor.name()),
            model: self.config.model.clone(),
            capabilities,
        }
    }

    fn endpoint_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
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
        self.config.flavor.stop_implies_tool_use()
    }

    fn assistant_turn(&self, message: &Message) -> Vec<Value> {
        convert::assistant_turn(message)
    }

    fn tool_results(&self, results: &[ToolResult]) -> Vec<Value> {
        convert::tool_results(self.config.flavor, results)
    }

    fn tool_definitions(&self, tools: &[ToolDefinition]) -> Value {
        convert::tool_definitions(tools)
    }
}
