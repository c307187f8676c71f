//! Google AI (Gemini) support for `llm-relay`.
//!
//! [`GoogleProvider`] streams from
//! `models/{model}:streamGenerateContent?alt=sse`, reports thought
//! summaries as reasoning, and answers function calls with
//! `functionResponse` parts in the payload's `contents` array.

#![warn(missing_docs)]

mod config;
mod convert;
mod factory;
mod provider;
mod stream;
mod types;

pub use config::GoogleConfig;
pub use factory::{GoogleFactory, register_global};
pub use provider::GoogleProvider;
