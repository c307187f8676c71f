//! Google AI provider configuration.

use std::time::Duration;

/// Configuration for the Google AI (Gemini) provider.
///
/// ```rust
/// use llm_relay_google::GoogleConfig;
///
/// let config = GoogleConfig {
///     api_key: "AIza...".into(),
///     model: "gemini-2.5-pro".into(),
///     ..Default::default()
/// };
/// ```
#[derive(Clone)]
pub struct GoogleConfig {
    /// API key, sent as `x-goog-api-key`. Required.
    pub api_key: String,
    /// Model identifier (e.g. `"gemini-2.5-flash"`). A leading
    /// `models/` is accepted.
    pub model: String,
    /// Base URL including the API version.
    pub base_url: String,
    /// Per-request timeout. `None` leaves the transport's own timeout
    /// in effect.
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.5-flash".into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            timeout: None,
        }
    }
}
