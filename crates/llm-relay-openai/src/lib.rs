//! `OpenAI` Chat Completions and Responses API support for `llm-relay`.
//!
//! | Provider | Endpoint | History field |
//! |----------|----------|---------------|
//! | [`OpenAiProvider`] | `{base}/chat/completions` | `messages` |
//! | [`ResponsesProvider`] | `{base}/responses` | `input` |
//!
//! [`OpenAiProvider`] also serves servers that copy the Chat Completions
//! wire format; pick one with [`OpenAiFlavor`]:
//!
//! ```rust
//! use llm_relay::Provider;
//! use llm_relay_openai::{OpenAiConfig, OpenAiFlavor, OpenAiProvider};
//!
//! let mistral = OpenAiProvider::new(OpenAiConfig {
//!     api_key: "...".into(),
//!     ..OpenAiConfig::for_flavor(OpenAiFlavor::Mistral)
//! });
//! assert_eq!(mistral.endpoint_url(), "https://api.mistral.ai/v1/chat/completions");
//!
//! let local = OpenAiProvider::new(OpenAiConfig::for_flavor(OpenAiFlavor::LmStudio));
//! assert_eq!(local.metadata().name, "lmstudio");
//! ```

#![warn(missing_docs)]

mod config;
mod convert;
mod factory;
mod provider;
mod responses;
mod stream;
mod types;

pub use config::{OpenAiConfig, OpenAiFlavor, ResponsesConfig};
pub use factory::{OpenAiFactory, ResponsesFactory, register_global};
pub use provider::OpenAiProvider;
pub use responses::ResponsesProvider;
