//! Provider configuration for Chat Completions flavors and the Responses API.

use std::time::Duration;

/// A server speaking the Chat Completions wire format.
///
/// Flavors differ in defaults (base URL, model, whether a key is
/// required) and in small serialization details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum OpenAiFlavor {
    /// `api.openai.com`.
    #[default]
    OpenAi,
    /// `api.mistral.ai`. Tool messages carry the tool's `name`.
    Mistral,
    /// Any self-hosted OpenAI-compatible server.
    Compatible,
    /// LM Studio's local server.
    LmStudio,
    /// llama.cpp's `llama-server`.
    LlamaCpp,
    /// `openrouter.ai`.
    OpenRouter,
}

impl OpenAiFlavor {
    /// Every flavor, in registration order.
    pub const ALL: [Self; 6] = [
        Self::OpenAi,
        Self::Mistral,
        Self::Compatible,
        Self::LmStudio,
        Self::LlamaCpp,
        Self::OpenRouter,
    ];

    /// The registry name of this flavor.
    pub fn name(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Mistral => "mistral",
            Self::Compatible => "openai-compatible",
            Self::LmStudio => "lmstudio",
            Self::LlamaCpp => "llamacpp",
            Self::OpenRouter => "openrouter",
        }
    }

    /// Default base URL, including the `/v1` prefix.
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Mistral => "https://api.mistral.ai/v1",
            Self::Compatible | Self::LmStudio => "http://localhost:1234/v1",
            Self::LlamaCpp => "http://localhost:8080/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    /// Default model identifier.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o",
            Self::Mistral => "mistral-large-latest",
            Self::OpenRouter => "openai/gpt-4o",
            Self::Compatible | Self::LmStudio | Self::LlamaCpp => "local-model",
        }
    }

    /// Hosted services reject unauthenticated requests; local servers
    /// usually accept them.
    pub fn requires_api_key(self) -> bool {
        matches!(self, Self::OpenAi | Self::Mistral | Self::OpenRouter)
    }

    /// Local servers are inconsistent about `finish_reason` and often
    /// report `stop` for turns that end in tool calls.
    pub fn stop_implies_tool_use(self) -> bool {
        matches!(self, Self::Compatible | Self::LmStudio | Self::LlamaCpp)
    }

    pub(crate) fn tool_result_includes_name(self) -> bool {
        self == Self::Mistral
    }
}

/// Configuration for [`OpenAiProvider`](crate::OpenAiProvider).
///
/// ```rust
/// use llm_relay_openai::{OpenAiConfig, OpenAiFlavor};
///
/// let config = OpenAiConfig {
///     api_key: "sk-...".into(),
///     model: "gpt-4o-mini".into(),
///     ..Default::default()
/// };
/// assert_eq!(config.flavor, OpenAiFlavor::OpenAi);
///
/// let local = OpenAiConfig::for_flavor(OpenAiFlavor::LlamaCpp);
/// assert_eq!(local.base_url, "http://localhost:8080/v1");
/// ```
#[derive(Clone)]
pub struct OpenAiConfig {
    /// API key sent as a bearer token. Empty sends no `Authorization`
    /// header.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Base URL for the API, including the version prefix.
    pub base_url: String,
    /// Optional `OpenAI-Organization` header.
    pub organization: Option<String>,
    /// Which server this talks to.
    pub flavor: OpenAiFlavor,
    /// Per-request timeout. `None` leaves the transport's own timeout
    /// in effect.
    pub timeout: Option<Duration>,
}

impl OpenAiConfig {
    /// Defaults for `flavor`.
    pub fn for_flavor(flavor: OpenAiFlavor) -> Self {
        Self {
            api_key: String::new(),
            model: flavor.default_model().into(),
            base_url: flavor.default_base_url().into(),
            organization: None,
            flavor,
            timeout: None,
        }
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("organization", &self.organization)
            .field("flavor", &self.flavor)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self::for_flavor(OpenAiFlavor::OpenAi)
    }
}

/// Configuration for [`ResponsesProvider`](crate::ResponsesProvider).
#[derive(Clone)]
pub struct ResponsesConfig {
    /// `OpenAI` API key. Required.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Base URL for the API, including the version prefix.
    pub base_url: String,
    /// Optional `OpenAI-Organization` header.
    pub organization: Option<String>,
    /// Per-request timeout. `None` leaves the transport's own timeout
    /// in effect.
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for ResponsesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponsesConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("organization", &self.organization)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for ResponsesConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4.1".into(),
            base_url: "https://api.openai.com/v1".into(),
            organization: None,
            timeout: None,
        }
    }
}
