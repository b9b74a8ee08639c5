//! Listen addresses for the network transports

use crate::error::ServerError;
use std::net::SocketAddr;

/// Default HTTP listen address
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8000";

/// Default WebSocket listen address
pub const DEFAULT_WS_ADDR: &str = "0.0.0.0:8001";

/// Transport settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// HTTP transport address (`MCP_HTTP_ADDR`)
    pub http_addr: SocketAddr,
    /// WebSocket transport address (`MCP_WS_ADDR`)
    pub ws_addr: SocketAddr,
}

impl ServerConfig {
    /// Load from `MCP_HTTP_ADDR` and `MCP_WS_ADDR`
    ///
    /// # Errors
    ///
    /// Returns `ServerError::InvalidAddress` if either value is not a socket
    /// address
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        Ok(Self {
            http_addr: parse_addr("MCP_HTTP_ADDR", lookup("MCP_HTTP_ADDR"), DEFAULT_HTTP_ADDR)?,
            ws_addr: parse_addr("MCP_WS_ADDR", lookup("MCP_WS_ADDR"), DEFAULT_WS_ADDR)?,
        })
    }
}

fn parse_addr(name: &'static str, value: Option<String>, default: &str) -> Result<SocketAddr, ServerError> {
    let value = value.unwrap_or_else(|| default.to_string());
    value
        .parse()
        .map_err(|_| ServerError::InvalidAddress { name, value })
}
