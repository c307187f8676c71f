//! Tool handler trait and closure-backed implementation.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ToolError, ToolOutput};

/// A tool the model can invoke.
///
/// Request-template code renders these into each vendor's `tools` array;
/// the orchestrator matches incoming calls against [`name`](Self::name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool's name, matched against [`ToolCall::name`](crate::message::ToolCall::name).
    pub name: String,
    /// Description shown to the model.
    pub description: String,
    /// JSON Schema describing the tool's input.
    pub parameters: Value,
}

/// The future returned by [`ToolHandler::execute`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + 'a>>;

/// A single tool that can be invoked by the model.
///
/// The trait is object-safe (boxed futures) so handlers are stored as
/// `Arc<dyn ToolHandler>`. For simple tools, wrap a closure with
/// [`tool_fn`](super::tool_fn).
///
/// # Example
///
/// ```rust
/// use llm_relay::tool::{ToolDefinition, ToolFuture, ToolHandler, ToolOutput};
/// use serde_json::{json, Value};
///
/// struct ListFiles {
///     root: String,
/// }
///
/// impl ToolHandler for ListFiles {
///     fn definition(&self) -> ToolDefinition {
///         ToolDefinition {
///             name: "list_files".into(),
///             description: "List files below the project root".into(),
///             parameters: json!({"type": "object"}),
///         }
///     }
///
///     fn display_name(&self) -> String {
///         "Listing files".into()
///     }
///
///     fn execute(&self, _input: Value) -> ToolFuture<'_> {
///         Box::pin(async move { Ok(ToolOutput::new(format!("{}/src", self.root))) })
///     }
/// }
/// ```
pub trait ToolHandler: Send + Sync {
    /// Returns the tool's definition (name, description, parameter schema).
    fn definition(&self) -> ToolDefinition;

    /// Label shown to users while the tool runs. Defaults to the name.
    fn display_name(&self) -> String {
        self.definition().name
    }

    /// Whether the tool only reads state. Read-only tools are the ones
    /// offered under [`ToolFilter::ReadOnly`](super::ToolFilter::ReadOnly).
    fn is_read_only(&self) -> bool {
        false
    }

    /// Executes the tool with the given JSON arguments.
    fn execute(&self, input: Value) -> ToolFuture<'_>;
}

/// A tool handler backed by an async closure.
///
/// Created via [`tool_fn`](super::tool_fn).
pub struct FnToolHandler<F> {
    pub(crate) definition: ToolDefinition,
    pub(crate) display_name: Option<String>,
    pub(crate) read_only: bool,
    pub(crate) handler: F,
}

impl<F> FnToolHandler<F> {
    /// Sets the label shown to users while the tool runs.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Marks the tool as read-only.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

impl<F> std::fmt::Debug for FnToolHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnToolHandler")
            .field("name", &self.definition.name)
            .field("display_name", &self.display_name)
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

impl<F, Fut, O> ToolHandler for FnToolHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, ToolError>> + Send + 'static,
    O: Into<ToolOutput> + Send + 'static,
{
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    fn display_name(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.definition.name.clone())
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn execute(&self, input: Value) -> ToolFuture<'_> {
        let fut = (self.handler)(input);
        Box::pin(async move { fut.await.map(Into::into) })
    }
}
