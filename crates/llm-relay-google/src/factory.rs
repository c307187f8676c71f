//! Factory for building Google AI providers from configuration.

use std::sync::Arc;

use llm_relay::registry::{ProviderConfig, ProviderFactory};
use llm_relay::{LlmError, Provider, ProviderRegistry};

use crate::{GoogleConfig, GoogleProvider};

/// Builds [`GoogleProvider`]s from a [`ProviderConfig`].
///
/// | Field | Required | Description |
/// |-------|----------|-------------|
/// | `provider` | Yes | `"google"` |
/// | `api_key` | Yes | Google AI API key |
/// | `model` | Yes | Model identifier |
/// | `base_url` | No | Custom API endpoint, including the version |
/// | `timeout` | No | Per-request timeout |
#[derive(Debug, Clone, Copy, Default)]
pub struct GoogleFactory;

impl ProviderFactory for GoogleFactory {
    fn name(&self) -> &'static str {
        "google"
    }

    fn build(&self, config: &ProviderConfig) -> Result<Arc<dyn Provider>, LlmError> {
        let mut google_config = GoogleConfig {
            api_key: config.require_api_key()?.to_string(),
            model: config.require_model()?.to_string(),
            ..Default::default()
        };
        if let Some(base_url) = &config.base_url {
            google_config.base_url.clone_from(base_url);
        }
        google_config.timeout = config.timeout;
        Ok(Arc::new(GoogleProvider::new(google_config)))
    }
}

/// Registers [`GoogleFactory`] with the global registry.
pub fn register_global() {
    ProviderRegistry::global().register(Box::new(GoogleFactory));
}
