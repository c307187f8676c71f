//! Ollama provider configuration.

use std::time::Duration;

/// Configuration for the Ollama provider.
///
/// Use struct update syntax with [`Default`] for ergonomic construction:
///
/// ```rust
/// use llm_relay_ollama::OllamaConfig;
///
/// let config = OllamaConfig {
///     model: "qwen3".into(),
///     ..Default::default()
/// };
/// ```
#[derive(Clone)]
pub struct OllamaConfig {
    /// Model identifier (e.g. `"llama3.2"`, `"qwen3"`).
    pub model: String,
    /// Base URL for the Ollama API. Defaults to `http://localhost:11434`.
    pub base_url: String,
    /// Bearer token for servers behind an authenticating proxy.
    pub api_key: Option<String>,
    /// Per-request timeout. `None` leaves the transport's own timeout
    /// in effect.
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for OllamaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            model: "llama3.2".into(),
            base_url: "http://localhost:11434".into(),
            api_key: None,
            timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OllamaConfig::default();
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.base_url, "http://localhost:11434");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_debug_output() {
        let config = OllamaConfig {
            api_key: Some("proxy-secret".into()),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("llama3.2"));
        assert!(debug.contains("localhost:11434"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("proxy-secret"));
    }

    #[test]
    fn test_config_override() {
        let config = OllamaConfig {
            model: "mistral".into(),
            base_url: "http://remote:11434".into(),
            ..Default::default()
        };
        assert_eq!(config.model, "mistral");
        assert_eq!(config.base_url, "http://remote:11434");
    }
}
