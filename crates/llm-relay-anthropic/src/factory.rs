//! Factory for building Anthropic providers from configuration.

use std::sync::Arc;

use llm_relay::registry::{ProviderConfig, ProviderFactory};
use llm_relay::{LlmError, Provider, ProviderRegistry};

use crate::{AnthropicConfig, AnthropicProvider};

/// Builds [`AnthropicProvider`]s from a [`ProviderConfig`].
///
/// | Field | Required | Description |
/// |-------|----------|-------------|
/// | `provider` | Yes | `"anthropic"` |
/// | `api_key` | Yes | Anthropic API key |
/// | `model` | Yes | Model identifier |
/// | `base_url` | No | Custom API endpoint |
/// | `timeout` | No | Per-request timeout |
/// | `extra.api_version` | No | `anthropic-version` header |
/// | `extra.beta` | No | `anthropic-beta` header |
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicFactory;

impl ProviderFactory for AnthropicFactory {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn build(&self, config: &ProviderConfig) -> Result<Arc<dyn Provider>, LlmError> {
        let mut anthropic_config = AnthropicConfig {
            api_key: config.require_api_key()?.to_string(),
            model: config.require_model()?.to_string(),
            ..Default::default()
        };

        if let Some(base_url) = &config.base_url {
            anthropic_config.base_url.clone_from(base_url);
        }
        anthropic_config.timeout = config.timeout;
        if let Some(api_version) = config.get_extra_str("api_version") {
            anthropic_config.api_version = api_version.to_string();
        }
        if let Some(beta) = config.get_extra_str("beta") {
            anthropic_config.beta = Some(beta.to_string());
        }

        Ok(Arc::new(AnthropicProvider::new(anthropic_config)))
    }
}

/// Registers [`AnthropicFactory`] with the global registry.
pub fn register_global() {
    ProviderRegistry::global().register(Box::new(AnthropicFactory));
}
