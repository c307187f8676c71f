//! Configuration-driven provider construction.
//!
//! Vendor crates register a [`ProviderFactory`] under a lowercase name;
//! applications then build an `Arc<dyn Provider>` from a
//! [`ProviderConfig`] without naming the vendor crate's types.
//!
//! ```rust,no_run
//! use llm_relay::registry::{ProviderConfig, ProviderRegistry};
//!
//! // After e.g. `llm_relay_anthropic::register_global()`:
//! let config = ProviderConfig::new("anthropic", "claude-sonnet-4-5")
//!     .api_key("sk-ant-...");
//! let provider = ProviderRegistry::global().build(&config).unwrap();
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde_json::Value;

use crate::error::LlmError;
use crate::provider::Provider;

/// Vendor-neutral provider settings.
///
/// Vendor-specific options go in `extra`; each factory documents the
/// keys it reads.
#[derive(Clone, Default)]
pub struct ProviderConfig {
    /// Registered provider name (`"anthropic"`, `"mistral"`, ...).
    pub provider: String,
    /// API key, for vendors that need one.
    pub api_key: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Overrides the vendor's default base URL.
    pub base_url: Option<String>,
    /// Per-request timeout. Factories hand it to the built provider,
    /// which reports it through
    /// [`Provider::request_timeout`](crate::provider::Provider::request_timeout).
    pub timeout: Option<Duration>,
    /// Vendor-specific options.
    pub extra: HashMap<String, Value>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("extra", &self.extra)
            .finish()
    }
}

impl ProviderConfig {
    /// Creates a config for `provider` and `model`.
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Adds a vendor-specific option.
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// A string option from `extra`.
    pub fn get_extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// A boolean option from `extra`.
    pub fn get_extra_bool(&self, key: &str) -> Option<bool> {
        self.extra.get(key).and_then(Value::as_bool)
    }

    /// Returns the API key.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidRequest`] naming the provider when no
    /// key is configured.
    pub fn require_api_key(&self) -> Result<&str, LlmError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                LlmError::InvalidRequest(format!("{} provider requires api_key", self.provider))
            })
    }

    /// Returns the model.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidRequest`] when the model is empty.
    pub fn require_model(&self) -> Result<&str, LlmError> {
        if self.model.is_empty() {
            return Err(LlmError::InvalidRequest(format!(
                "{} provider requires model",
                self.provider
            )));
        }
        Ok(&self.model)
    }
}

/// Builds one vendor's provider from a [`ProviderConfig`].
pub trait ProviderFactory: Send + Sync {
    /// Lowercase registration name.
    fn name(&self) -> &str;

    /// Creates a provider.
    ///
    /// # Errors
    ///
    /// Returns an error when the config is missing something the vendor
    /// needs, such as an API key.
    fn build(&self, config: &ProviderConfig) -> Result<Arc<dyn Provider>, LlmError>;
}

/// Provider factories by name.
///
/// Use [`ProviderRegistry::global`] for the process-wide registry, or
/// [`ProviderRegistry::new`] for an isolated one.
pub struct ProviderRegistry {
    factories: RwLock<HashMap<String, Arc<dyn ProviderFactory>>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide registry vendor crates register into.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<ProviderRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ProviderRegistry::new)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn ProviderFactory>>> {
        self.factories.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn ProviderFactory>>> {
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a factory, replacing any with the same name.
    pub fn register(&self, factory: Box<dyn ProviderFactory>) -> &Self {
        self.register_shared(Arc::from(factory))
    }

    /// Registers a shared factory, replacing any with the same name.
    pub fn register_shared(&self, factory: Arc<dyn ProviderFactory>) -> &Self {
        let name = factory.name().to_lowercase();
        self.write().insert(name, factory);
        self
    }

    /// Removes a factory. Returns `true` if one was registered.
    pub fn unregister(&self, name: &str) -> bool {
        self.write().remove(&name.to_lowercase()).is_some()
    }

    /// Whether a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(&name.to_lowercase())
    }

    /// Registered names, sorted.
    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<_> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Builds a provider via the factory named by `config.provider`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidRequest`] for an unknown name, or
    /// whatever the factory reports.
    pub fn build(&self, config: &ProviderConfig) -> Result<Arc<dyn Provider>, LlmError> {
        let factory = {
            let factories = self.read();
            factories
                .get(&config.provider.to_lowercase())
                .cloned()
                .ok_or_else(|| {
                    let mut available: Vec<_> = factories.keys().cloned().collect();
                    available.sort();
                    LlmError::InvalidRequest(format!(
                        "unknown provider '{}'. Available: {available:?}",
                        config.provider
                    ))
                })?
        };
        factory.build(config)
    }
}
