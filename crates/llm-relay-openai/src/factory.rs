//! Factories for building Chat Completions and Responses providers from
//! configuration.

use std::sync::Arc;

use llm_relay::registry::{ProviderConfig, ProviderFactory};
use llm_relay::{LlmError, Provider, ProviderRegistry};

use crate::{OpenAiConfig, OpenAiFlavor, OpenAiProvider, ResponsesConfig, ResponsesProvider};

/// Builds [`OpenAiProvider`]s of one [`OpenAiFlavor`].
///
/// | Field | Required | Description |
/// |-------|----------|-------------|
/// | `provider` | Yes | The flavor name, e.g. `"openai"`, `"mistral"`, `"lmstudio"` |
/// | `api_key` | Hosted flavors | Bearer token |
/// | `model` | Yes | Model identifier |
/// | `base_url` | No | Custom API endpoint, including `/v1` |
/// | `timeout` | No | Per-request timeout |
/// | `extra.organization` | No | `OpenAI-Organization` header |
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiFactory {
    flavor: OpenAiFlavor,
}

impl OpenAiFactory {
    /// A factory for `flavor`.
    pub fn new(flavor: OpenAiFlavor) -> Self {
        Self { flavor }
    }
}

impl ProviderFactory for OpenAiFactory {
    fn name(&self) -> &'static str {
        self.flavor.name()
    }

    fn build(&self, config: &ProviderConfig) -> Result<Arc<dyn Provider>, LlmError> {
        let api_key = if self.flavor.requires_api_key() {
            config.require_api_key()?.to_string()
        } else {
            config.api_key.clone().unwrap_or_default()
        };

        let mut openai_config = OpenAiConfig {
            api_key,
            model: config.require_model()?.to_string(),
            ..OpenAiConfig::for_flavor(self.flavor)
        };
        if let Some(base_url) = &config.base_url {
            openai_config.base_url.clone_from(base_url);
        }
        openai_config.timeout = config.timeout;
        if let Some(organization) = config.get_extra_str("organization") {
            openai_config.organization = Some(organization.to_string());
        }

        Ok(Arc::new(OpenAiProvider::new(openai_config)))
    }
}

/// Builds [`ResponsesProvider`]s; registered as `"openai-responses"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponsesFactory;

impl ProviderFactory for ResponsesFactory {
    fn name(&self) -> &'static str {
        "openai-responses"
    }

    fn build(&self, config: &ProviderConfig) -> Result<Arc<dyn Provider>, LlmError> {
        let mut responses_config = ResponsesConfig {
            api_key: config.require_api_key()?.to_string(),
            model: config.require_model()?.to_string(),
            ..Default::default()
        };
        if let Some(base_url) = &config.base_url {
            responses_config.base_url.clone_from(base_url);
        }
        responses_config.timeout = config.timeout;
        if let Some(organization) = config.get_extra_str("organization") {
            responses_config.organization = Some(organization.to_string());
        }
        Ok(Arc::new(ResponsesProvider::new(responses_config)))
    }
}

/// Registers a factory for every [`OpenAiFlavor`] plus
/// [`ResponsesFactory`] with the global registry.
pub fn register_global() {
    let registry = ProviderRegistry::global();
    for flavor in OpenAiFlavor::ALL {
        registry.register(Box::new(OpenAiFactory::new(flavor)));
    }
    registry.register(Box::new(ResponsesFactory));
}
