//! HTTP transport
//!
//! - `POST /mcp`: one JSON-RPC message per request body
//! - `GET /health`: liveness with the number of served tools
//!
//! Plain request/response has no channel for server notifications, so
//! progress on this transport goes to the log.

use crate::error::ServerError;
use crate::protocol::McpHandler;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the HTTP router
pub fn router(handler: Arc<McpHandler>) -> Router {
    Router::new()
        .route("/mcp", post(mcp_handler))
        .route("/health", get(health_handler))
        .with_state(handler)
        .layer(TraceLayer::new_for_http())
}

/// Serve HTTP on `addr` until the listener fails
///
/// # Errors
///
/// Returns `ServerError::Bind` if `addr` cannot be bound, or
/// `ServerError::Io` if serving fails
pub async fn serve_http(handler: Arc<McpHandler>, addr: SocketAddr) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    info!(%addr, "Serving MCP over HTTP (POST /mcp, GET /health)");
    axum::serve(listener, router(handler)).await?;
    Ok(())
}

async fn mcp_handler(State(handler): State<Arc<McpHandler>>, body: String) -> Response {
    match handler.handle_message(&body, None).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

#[allow(clippy::unused_async)] // Axum handler signature requires async
async fn health_handler(State(handler): State<Arc<McpHandler>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "tools": handler.registry().count(),
    }))
}
