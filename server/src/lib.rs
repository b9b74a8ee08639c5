//! MCP server exposing the weather tools
//!
//! The same [`McpHandler`] is served over three transports, tried in order:
//! stdio, then HTTP, then WebSocket. Each failure is logged before moving on;
//! only when all three fail does startup give up.
//!
//! ## Modules
//!
//! - `protocol`: JSON-RPC types and the MCP method dispatcher
//! - `progress`: progress forwarding as `notifications/progress`
//! - `stdio`, `http`, `ws`: transports
//! - `config`: listen addresses
//! - `error`: server error type

pub mod config;
pub mod error;
pub mod http;
pub mod progress;
pub mod protocol;
pub mod stdio;
pub mod ws;

#[cfg(test)]
mod test_support;

pub use config::ServerConfig;
pub use error::ServerError;
pub use protocol::McpHandler;

use futures::future::BoxFuture;
use mcp_integration_tools::{RequestConfig, ToolRegistry, WeatherConfig, WeatherTools, register_weather_tools};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Build a registry holding every weather tool
///
/// # Errors
///
/// Returns `ServerError::Transport` if the HTTP client cannot be built
pub fn build_registry(weather: WeatherConfig, request: RequestConfig) -> Result<ToolRegistry, ServerError> {
    let tools = Arc::new(WeatherTools::from_config(weather, request)?);
    let registry = ToolRegistry::new();
    register_weather_tools(&registry, &tools);

    info!(tools = ?registry.list_tools(), "Tool registry ready");
    Ok(registry)
}

/// One transport in the fallback chain
pub type TransportAttempt = (&'static str, BoxFuture<'static, Result<(), ServerError>>);

/// Run `attempts` in order until one finishes without error
///
/// # Errors
///
/// Returns `ServerError::AllTransportsFailed` once every attempt has failed
pub async fn run_with_fallback(attempts: Vec<TransportAttempt>) -> Result<(), ServerError> {
    let mut remaining = attempts.len();

    for (name, attempt) in attempts {
        remaining -= 1;
        match attempt.await {
            Ok(()) => {
                info!(transport = name, "Transport finished");
                return Ok(());
            }
            Err(e) if remaining > 0 => {
                warn!(transport = name, error = %e, "Transport failed, falling back");
            }
            Err(e) => {
                error!(transport = name, error = %e, "Last transport failed");
            }
        }
    }

    Err(ServerError::AllTransportsFailed)
}

/// Serve `handler` over stdio, falling back to HTTP and then WebSocket
///
/// # Errors
///
/// Returns `ServerError::AllTransportsFailed` if no transport could run
pub async fn serve(handler: McpHandler, config: ServerConfig) -> Result<(), ServerError> {
    let handler = Arc::new(handler);

    run_with_fallback(vec![
        ("stdio", Box::pin(stdio::serve_stdio(Arc::clone(&handler)))),
        ("http", Box::pin(http::serve_http(Arc::clone(&handler), config.http_addr))),
        ("websocket", Box::pin(ws::serve_ws(handler, config.ws_addr))),
    ])
    .await
}
