//! Tool registry for looking up handlers by name.

use std::collections::HashMap;
use std::sync::Arc;

use super::{ToolDefinition, ToolHandler};

/// Which registered tools to offer the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolFilter {
    /// Every registered tool.
    #[default]
    All,
    /// Only tools whose handler reports [`ToolHandler::is_read_only`].
    ReadOnly,
}

impl ToolFilter {
    fn admits(self, handler: &dyn ToolHandler) -> bool {
        match self {
            Self::All => true,
            Self::ReadOnly => handler.is_read_only(),
        }
    }
}

/// A registry of tool handlers, indexed by name.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool handler.
    ///
    /// If a handler with the same name already exists, it is replaced.
    pub fn register(&mut self, handler: impl ToolHandler + 'static) -> &mut Self {
        let name = handler.definition().name;
        self.handlers.insert(name, Arc::new(handler));
        self
    }

    /// Registers a shared tool handler.
    pub fn register_shared(&mut self, handler: Arc<dyn ToolHandler>) -> &mut Self {
        let name = handler.definition().name;
        self.handlers.insert(name, handler);
        self
    }

    /// Returns the handler for the given tool name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.handlers.get(name)
    }

    /// Returns whether a tool with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Returns the definitions of all registered tools, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.definitions_for(ToolFilter::All)
    }

    /// Returns the definitions of the tools `filter` admits, sorted by
    /// name.
    pub fn definitions_for(&self, filter: ToolFilter) -> Vec<ToolDefinition> {
        let mut definitions: Vec<_> = self
            .handlers
            .values()
            .filter(|h| filter.admits(h.as_ref()))
            .map(|h| h.definition())
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Returns the number of registered tools.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
