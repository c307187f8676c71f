//! Claude Messages API support for `llm-relay`.
//!
//! [`AnthropicProvider`] parses the Messages API's SSE stream (text,
//! extended thinking with signatures, redacted thinking, streamed tool
//! input) and writes assistant turns and `tool_result` blocks back into
//! the request's `messages` array.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use llm_relay::session::{Coordinator, CoordinatorConfig, LlmRequest};
//! use llm_relay::transport::{HttpTransport, HttpTransportConfig};
//! use llm_relay::ToolRegistry;
//! use llm_relay_anthropic::{AnthropicConfig, AnthropicProvider};
//!
//! # async fn example() -> Result<(), llm_relay::LlmError> {
//! let provider = Arc::new(AnthropicProvider::new(AnthropicConfig {
//!     api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
//!     ..Default::default()
//! }));
//! let transport = Arc::new(HttpTransport::new(HttpTransportConfig::default())?);
//! let (coordinator, mut events) =
//!     Coordinator::new(transport, ToolRegistry::new(), CoordinatorConfig::default());
//!
//! let payload = serde_json::json!({
//!     "model": "claude-sonnet-4-5",
//!     "max_tokens": 1024,
//!     "stream": true,
//!     "messages": [{"role": "user", "content": "Hello!"}],
//! });
//! coordinator.send(LlmRequest::new("req-1", provider, payload))?;
//! while let Some(event) = events.recv().await {
//!     if event.is_terminal() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod convert;
mod factory;
mod provider;
mod stream;
mod types;

pub use config::AnthropicConfig;
pub use factory::{AnthropicFactory, register_global};
pub use provider::AnthropicProvider;
