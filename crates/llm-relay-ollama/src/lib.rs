//! Ollama support for `llm-relay`.
//!
//! [`OllamaProvider`] streams newline-delimited JSON from `/api/chat`.
//! Thinking models report reasoning through `message.thinking`; tool
//! calls arrive whole and results go back as `tool` messages named by
//! `tool_name`.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use llm_relay::session::{Coordinator, CoordinatorConfig, LlmRequest};
//! use llm_relay::transport::{HttpTransport, HttpTransportConfig};
//! use llm_relay::ToolRegistry;
//! use llm_relay_ollama::{OllamaConfig, OllamaProvider};
//!
//! # fn example() -> Result<(), llm_relay::LlmError> {
//! let transport = Arc::new(HttpTransport::new(HttpTransportConfig::default())?);
//! let (coordinator, _events) =
//!     Coordinator::new(transport, ToolRegistry::new(), CoordinatorConfig::default());
//! let provider = Arc::new(OllamaProvider::new(OllamaConfig::default()));
//! let payload = serde_json::json!({
//!     "model": "llama3.2",
//!     "stream": true,
//!     "messages": [{"role": "user", "content": "Hello"}],
//! });
//! coordinator.send(LlmRequest::new("req-1", provider, payload))?;
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

pub use config::OllamaConfig;
pub use factory::{OllamaFactory, register_global};
pub use provider::OllamaProvider;
