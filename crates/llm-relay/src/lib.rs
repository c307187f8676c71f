//! # llm-relay
//!
//! A client-side engine for streaming LLM conversations that call tools.
//!
//! Vendors stream their answers in divergent incremental formats. This
//! crate frames the raw bytes into lines, has a vendor [`Provider`]
//! turn each line into normalized [`StreamEvent`]s, folds those into a
//! typed [`Message`], and, when the model asks for tools, runs them one
//! at a time and resubmits the conversation with their results. A
//! [`Coordinator`] drives all of that per request id and reports
//! progress as [`SessionEvent`]s.
//!
//! # Provider crates
//!
//! | Crate | Vendor |
//! |-------|--------|
//! | `llm-relay-anthropic` | Claude Messages API |
//! | `llm-relay-openai` | `OpenAI` Chat Completions (plus Mistral and compatible servers) and the Responses API |
//! | `llm-relay-google` | Google AI (Gemini) |
//! | `llm-relay-ollama` | Ollama |
//!
//! # Data flow
//!
//! ```text
//!   Transport ──bytes──► LineFramer ──lines──► Provider::parse_line
//!                                                    │ StreamEvent
//!                                                    ▼
//!   SessionEvent ◄── Coordinator ◄── state ── Message::apply
//!                        │
//!                        ├─ RequiresToolExecution ──► ToolOrchestrator
//!                        └─ continuation payload ──► Transport (next round)
//! ```
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`framer`] | Incremental byte-to-line framing |
//! | [`stream`] | Normalized stream events |
//! | [`message`] | The per-round message builder |
//! | [`provider`] | The vendor seam |
//! | [`transport`] | HTTP streaming transport |
//! | [`tool`] | Tool handlers, registry and sequential orchestrator |
//! | [`session`] | The per-request state machine |
//! | [`registry`] | Building providers from configuration |
//! | [`error`] | The unified [`LlmError`] |
//! | [`usage`] | Token accounting |

#![warn(missing_docs)]

pub mod error;
pub mod framer;
pub mod message;
pub mod provider;
pub mod registry;
pub mod session;
pub mod stream;
pub mod tool;
pub mod transport;
pub mod usage;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_helpers;

pub use error::LlmError;
pub use message::{ContentBlock, Message, MessageState, ToolCall, ToolResult};
pub use provider::Provider;
pub use registry::ProviderRegistry;
pub use session::{Coordinator, CoordinatorConfig, LlmRequest, RequestId, SessionEvent};
pub use stream::StreamEvent;
pub use tool::{ToolHandler, ToolRegistry};
pub use usage::Usage;
