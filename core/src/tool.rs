//! Tool definitions and the executor function type
//!
//! A tool is a named, externally callable operation with a JSON input schema.
//! Executors take the raw JSON arguments plus an optional progress sink and
//! always resolve to a [`ToolResult`].

use crate::progress::ProgressReporter;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Tool definition advertised to protocol clients
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Unique tool name (e.g. `get_current_weather`)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema describing the tool arguments
    pub input_schema: serde_json::Value,
}

/// Result from tool execution
pub type ToolResult = Result<String, ToolError>;

/// Tool execution errors
///
/// Only raised for malformed call arguments. Domain failures (unreachable
/// backend, unknown location) are rendered as plain text instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error message
    pub message: String,
}

impl ToolError {
    /// Create a tool error from any message
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ToolError {}

/// Boxed future returned by a tool executor
pub type ToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

/// Shared progress sink handed to an executor for one invocation
pub type ProgressHandle = Option<Arc<dyn ProgressReporter>>;

/// Tool executor function
///
/// Receives the JSON-encoded arguments and an optional progress sink.
pub type ToolExecutorFn = Arc<dyn Fn(String, ProgressHandle) -> ToolFuture + Send + Sync>;
