//! Tool registry shared by every transport
//!
//! Tools are stored by name next to their executor. Listing is sorted by
//! name so `tools/list` is stable across calls.

use mcp_integration_core::tool::{ProgressHandle, Tool, ToolError, ToolExecutorFn, ToolResult};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

type Entries = HashMap<String, (Tool, ToolExecutorFn)>;

/// Thread-safe tool registry
///
/// Cloning is cheap; clones share the same tool table.
///
/// ## Example
///
/// ```ignore
/// let registry = ToolRegistry::new();
/// register_weather_tools(&registry, &weather);
///
/// let text = registry
///     .execute("get_current_weather", r#"{"location": "Paris"}"#.to_string(), None)
///     .await?;
/// ```
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<RwLock<Entries>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.list_tools())
            .finish()
    }
}

impl ToolRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool with its executor
    ///
    /// Returns `true` if a tool with the same name was replaced.
    pub fn register(&self, tool: Tool, executor: ToolExecutorFn) -> bool {
        debug!(tool = %tool.name, "Registering tool");
        self.write()
            .insert(tool.name.clone(), (tool, executor))
            .is_some()
    }

    /// Execute a tool by name
    ///
    /// `input` is the JSON-encoded argument object. `progress` receives the
    /// tool's progress events, if given.
    ///
    /// # Errors
    ///
    /// Returns `ToolError` if the tool is unknown or rejects its input
    pub async fn execute(&self, name: &str, input: String, progress: ProgressHandle) -> ToolResult {
        // Release the lock before awaiting
        let executor = self.read().get(name).map(|(_, executor)| Arc::clone(executor));

        match executor {
            Some(executor) => executor(input, progress).await,
            None => Err(ToolError::new(format!("Tool not found: {name}"))),
        }
    }

    /// Registered tool names, sorted
    #[must_use]
    pub fn list_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Registered tool definitions, sorted by name
    #[must_use]
    pub fn get_tools(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self.read().values().map(|(tool, _)| tool.clone()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Definition of one tool
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<Tool> {
        self.read().get(name).map(|(tool, _)| tool.clone())
    }

    /// Number of registered tools
    #[must_use]
    pub fn count(&self) -> usize {
        self.read().len()
    }

    // A panicking executor never holds the lock, so a poisoned table is
    // still consistent.
    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.tools.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.tools.write().unwrap_or_else(PoisonError::into_inner)
    }
}
