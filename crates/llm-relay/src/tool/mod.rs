//! Tool handlers and their sequential execution.
//!
//! # Architecture
//!
//! ```text
//!   ToolHandler        : one tool (definition + async execute)
//!       │
//!   ToolRegistry       : handlers by name, definitions by ToolFilter
//!       │
//!   ToolOrchestrator   : per-request FIFO queue, one tool at a time,
//!                        cancellable, results delivered once on drain
//! ```
//!
//! Tool failures never fail a session: a handler error, an unknown tool
//! name or a panicking handler all become an `"Error: ..."` result that
//! is sent back to the model like any other output.

mod error;
mod handler;
mod helpers;
mod orchestrator;
mod output;
mod registry;

pub use error::ToolError;
pub use handler::{FnToolHandler, ToolDefinition, ToolFuture, ToolHandler};
pub use helpers::tool_fn;
pub use orchestrator::{EnqueueOutcome, ToolOrchestrator};
pub use output::ToolOutput;
pub use registry::{ToolFilter, ToolRegistry};

#[cfg(test)]
mod tests;
