//! Tool output types.

/// Output returned by a tool handler.
///
/// Vendors expect tool results as text. Tools with structured results
/// should `serde_json::to_string()` them.
///
/// ```rust
/// use llm_relay::tool::ToolOutput;
///
/// let output = ToolOutput::new("3 matches in src/");
/// assert_eq!(output.content, "3 matches in src/");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// The text returned to the model.
    pub content: String,
}

impl ToolOutput {
    /// Creates a new tool output with the given content.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl From<String> for ToolOutput {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ToolOutput {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
