//! # MCP Integration Core
//!
//! Shared types for the tool server: tool definitions, tool errors, and the
//! progress reporting side channel.
//!
//! ## Core Concepts
//!
//! - **Tool**: name, description and JSON input schema advertised to clients
//! - **Executor**: async function from JSON arguments to a text [`ToolResult`]
//! - **Progress**: optional, fire-and-forget status updates during a call
//!
//! Nothing in this crate performs network I/O.

pub mod progress;
pub mod tool;

pub use progress::{ChannelProgress, ProgressEvent, ProgressReporter, TracingProgress};
pub use tool::{ProgressHandle, Tool, ToolError, ToolExecutorFn, ToolFuture, ToolResult};
