//! Server error types

use mcp_integration_tools::{ConfigError, TransportError};
use std::net::SocketAddr;
use thiserror::Error;

/// Errors raised while configuring or running a transport
#[derive(Debug, Error)]
pub enum ServerError {
    /// Weather provider configuration is unusable
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// HTTP client could not be built
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A listen address could not be parsed
    #[error("Invalid address for {name}: {value}")]
    InvalidAddress {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },

    /// A listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: SocketAddr,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Connection I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Every transport in the fallback chain failed
    #[error("All transports failed")]
    AllTransportsFailed,
}
