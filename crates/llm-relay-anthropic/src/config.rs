//! Anthropic provider configuration.

use std::time::Duration;

/// Configuration for the Anthropic provider.
///
/// Use struct update syntax with [`Default`]:
///
/// ```rust
/// use llm_relay_anthropic::AnthropicConfig;
///
/// let config = AnthropicConfig {
///     api_key: "sk-ant-...".into(),
///     model: "claude-sonnet-4-5".into(),
///     ..Default::default()
/// };
/// ```
#[derive(Clone)]
pub struct AnthropicConfig {
    /// Anthropic API key. Required.
    pub api_key: String,
    /// Model identifier (e.g. `"claude-sonnet-4-5"`).
    pub model: String,
    /// Base URL for the API. Override for proxies or testing.
    pub base_url: String,
    /// `anthropic-version` header.
    pub api_version: String,
    /// Optional `anthropic-beta` header (comma-separated feature flags).
    pub beta: Option<String>,
    /// Per-request timeout. `None` leaves the transport's own timeout
    /// in effect.
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("beta", &self.beta)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "claude-sonnet-4-5".into(),
            base_url: "https://api.anthropic.com".into(),
            api_version: "2023-06-01".into(),
            beta: None,
            timeout: None,
        }
    }
}
