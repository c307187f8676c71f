//! Helper functions for creating tool handlers.

use std::future::Future;

use serde_json::Value;

use super::{FnToolHandler, ToolDefinition, ToolError, ToolOutput};

/// Creates a [`ToolHandler`](super::ToolHandler) from an async closure.
///
/// The closure receives the tool's JSON arguments and returns a
/// `Result<impl Into<ToolOutput>, ToolError>`. Returning
/// `Result<String, ToolError>` works via `From<String>`.
///
/// # Example
///
/// ```rust
/// use llm_relay::tool::{tool_fn, ToolDefinition, ToolHandler};
/// use serde_json::{json, Value};
///
/// let handler = tool_fn(
///     ToolDefinition {
///         name: "add".into(),
///         description: "Add two numbers".into(),
///         parameters: json!({
///             "type": "object",
///             "properties": {
///                 "a": { "type": "number" },
///                 "b": { "type": "number" }
///             },
///             "required": ["a", "b"]
///         }),
///     },
///     |input: Value| async move {
///         let a = input["a"].as_f64().unwrap_or(0.0);
///         let b = input["b"].as_f64().unwrap_or(0.0);
///         Ok(format!("{}", a + b))
///     },
/// )
/// .with_display_name("Adding");
///
/// assert_eq!(handler.display_name(), "Adding");
/// ```
pub fn tool_fn<F, Fut, O>(definition: ToolDefinition, handler: F) -> FnToolHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ToolError>> + Send + 'static,
    O: Into<ToolOutput> + Send + 'static,
{
    FnToolHandler {
        definition,
        display_name: None,
        read_only: false,
        handler,
    }
}
