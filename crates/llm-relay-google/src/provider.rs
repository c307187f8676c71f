//! Google AI `Provider` implementation.

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

use crate::config::GoogleConfig;
use crate::{convert, stream};

/// Gemini provider for the Google AI (Generative Language) API.
///
/// History lives in the payload's `contents` array. Gemini reports
/// `STOP` for turns that end in function calls, so a stop finish with
/// calls present requires tool execution.
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    config: GoogleConfig,
}

impl GoogleProvider {
    /// Create a provider from configuration.
    pub fn new(config: GoogleConfig) -> Self {
        Self { config }
    }

    /// The provider's configuration.
    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }
}

impl Provider for GoogleProvider {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: Cow::Borrowed("google"),
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
        let model = self
            .config
            .model
            .strip_prefix("models/")
            .unwrap_or(&self.config.model);
        format!("{base}/models/{model}:streamGenerateContent?alt=sse")
    }

    fn headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.config.api_key)
                .map_err(|_| LlmError::Auth("API key contains invalid header characters".into()))?,
        );
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

    fn history_field(&self) -> &'static str {
        "contents"
    }
}
