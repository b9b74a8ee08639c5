//! Resilient HTTP request engine and weather tools
//!
//! Outbound calls go through [`ResilientClient`], which picks a timeout and
//! retry budget per endpoint, escalates timeouts, backs off exponentially,
//! and reports progress as it goes. Failures never escape as errors: the
//! engine answers with `None` and tools turn that into a plain message.
//!
//! ## Modules
//!
//! - `config`: request engine and weather provider configuration
//! - `policy`: endpoint classification (slow vs fast)
//! - `retry`: retry state machine
//! - `transport`: HTTP transport seam and the `reqwest` implementation
//! - `engine`: the resilient request engine
//! - `format`: plain-text report formatters
//! - `weather`: weather tool endpoints and definitions
//! - `registry`: tool registry for dynamic tool management
//! - `mock`: scripted transport and recording progress for tests

pub mod config;
pub mod engine;
pub mod format;
pub mod mock;
pub mod policy;
pub mod registry;
pub mod retry;
pub mod transport;
pub mod weather;

pub use mcp_integration_core::tool::{Tool, ToolExecutorFn, ToolResult};

// Re-export commonly used types
pub use config::{ConfigError, RequestConfig, WeatherConfig};
pub use engine::{RequestError, ResilientClient};
pub use policy::{EndpointClass, RequestPolicy, classify};
pub use registry::ToolRegistry;
pub use transport::{ApiRequest, HttpTransport, ReqwestTransport, TransportError};
pub use weather::{WeatherTools, register_weather_tools};
