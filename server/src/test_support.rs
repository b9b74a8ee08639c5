//! Handler fixture shared by the transport tests

use crate::protocol::McpHandler;
use mcp_integration_core::progress::report;
use mcp_integration_core::tool::{ProgressHandle, Tool, ToolError, ToolExecutorFn, ToolFuture};
use mcp_integration_tools::ToolRegistry;
use serde_json::{Value, json};
use std::sync::Arc;

/// Handler serving a single `echo` tool
///
/// `echo` reports one progress event and returns its `text` argument.
pub fn handler() -> McpHandler {
    let registry = ToolRegistry::new();
    let tool = Tool {
        name: "echo".to_string(),
        description: "Echo the text argument".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"]
        }),
    };
    let executor: ToolExecutorFn = Arc::new(|input: String, progress: ProgressHandle| {
        Box::pin(async move {
            report(progress.as_deref(), "echoing");
            let args: Value = serde_json::from_str(&input).map_err(|e| ToolError::new(e.to_string()))?;
            args["text"]
                .as_str()
                .map(ToString::to_string)
                .ok_or_else(|| ToolError::new("text is required"))
        }) as ToolFuture
    });
    registry.register(tool, executor);
    McpHandler::new(registry)
}
