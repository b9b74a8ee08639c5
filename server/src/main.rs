//! `mcp-integration` - weather tools over MCP
//!
//! Tries stdio first, then HTTP on `MCP_HTTP_ADDR`, then WebSocket on
//! `MCP_WS_ADDR`. Logs go to stderr; stdout belongs to the stdio transport.
//!
//! Run with: `WEATHER_API_KEY=... cargo run --bin mcp-integration`

use anyhow::Context;
use mcp_integration_server::{McpHandler, ServerConfig, build_registry, serve};
use mcp_integration_tools::{RequestConfig, WeatherConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();

    init_tracing();

    let weather = WeatherConfig::from_env().context("Weather provider configuration")?;
    let server = ServerConfig::from_env().context("Server configuration")?;
    info!(base_url = %weather.base_url, ?server, "Starting MCP integration server");

    let registry = build_registry(weather, RequestConfig::default())?;

    serve(McpHandler::new(registry), server)
        .await
        .context("Unable to start any MCP transport")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mcp_integration=info,mcp_integration_server=info,mcp_integration_tools=info".into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
