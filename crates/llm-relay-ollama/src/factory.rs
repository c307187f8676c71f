//! Factory for building Ollama providers from configuration.

use std::sync::Arc;

use llm_relay::registry::{ProviderConfig, ProviderFactory};
use llm_relay::{LlmError, Provider, ProviderRegistry};

use crate::{OllamaConfig, OllamaProvider};

/// Factory for creating [`OllamaProvider`] instances from configuration.
///
/// ```rust,no_run
/// use llm_relay::ProviderRegistry;
/// use llm_relay_ollama::OllamaFactory;
///
/// ProviderRegistry::global().register(Box::new(OllamaFactory));
/// ```
///
/// # Configuration
///
/// | Field | Required | Description |
/// |-------|----------|-------------|
/// | `provider` | Yes | Must be `"ollama"` |
/// | `api_key` | No | Bearer token for authenticating proxies |
/// | `model` | Yes | Model identifier (e.g., `"llama3.2"`) |
/// | `base_url` | No | Custom API endpoint (default: `http://localhost:11434`) |
/// | `timeout` | No | Per-request timeout |
#[derive(Debug, Clone, Copy, Default)]
pub struct OllamaFactory;

impl ProviderFactory for OllamaFactory {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn build(&self, config: &ProviderConfig) -> Result<Arc<dyn Provider>, LlmError> {
        let mut ollama_config = OllamaConfig {
            model: config.require_model()?.to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            ..Default::default()
        };
        if let Some(base_url) = &config.base_url {
            ollama_config.base_url.clone_from(base_url);
        }
        ollama_config.timeout = config.timeout;
        Ok(Arc::new(OllamaProvider::new(ollama_config)))
    }
}

/// Registers [`OllamaFactory`] with the global registry.
pub fn register_global() {
    ProviderRegistry::global().register(Box::new(OllamaFactory));
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_factory_name() {
        assert_eq!(OllamaFactory.name(), "ollama");
    }

    #[test]
    fn test_factory_build_success() {
        let config = ProviderConfig::new("ollama", "llama3.2");
        let provider = OllamaFactory.build(&config).unwrap();
        assert_eq!(provider.metadata().name, "ollama");
        assert_eq!(provider.endpoint_url(), "http://localhost:11434/api/chat");
        assert!(provider.request_timeout().is_none());
    }

    #[test]
    fn test_factory_passes_timeout() {
        let config = ProviderConfig::new("ollama", "qwen3").timeout(Duration::from_secs(300));
        let provider = OllamaFactory.build(&config).unwrap();
        assert_eq!(provider.request_timeout(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_factory_build_with_base_url_and_key() {
        let config = ProviderConfig::new("ollama", "llama3.2")
            .base_url("http://remote:11434")
            .api_key("tok");
        let provider = OllamaFactory.build(&config).unwrap();
        assert_eq!(provider.endpoint_url(), "http://remote:11434/api/chat");
        assert_eq!(provider.headers().unwrap()["authorization"], "Bearer tok");
    }

    #[test]
    fn test_factory_missing_model() {
        let config = ProviderConfig::new("ollama", "");
        assert!(matches!(
            OllamaFactory.build(&config),
            Err(LlmError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_register_global() {
        register_global();
        assert!(ProviderRegistry::global().contains("ollama"));
    }
}
