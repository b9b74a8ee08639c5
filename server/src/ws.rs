//! WebSocket transport
//!
//! Each text frame carries one JSON-RPC message. Requests on a socket run
//! concurrently; responses and progress notifications share one sender task.
//!
//! ```text
//! Client            Socket task              McpHandler
//!   │                    │                        │
//!   ├─ tools/call ──────>├─ spawn ───────────────>│
//!   │<─ progress ────────┤<── notifier ───────────┤
//!   │<─ response ────────┤<── response ───────────┤
//! ```

use crate::error::ServerError;
use crate::protocol::{McpHandler, OutgoingMessage};
use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Build the WebSocket router (`GET /ws`)
pub fn router(handler: Arc<McpHandler>) -> Router {
    Router::new()
        .route("/ws", get(upgrade))
        .with_state(handler)
        .layer(TraceLayer::new_for_http())
}

/// Serve WebSocket connections on `addr`
///
/// # Errors
///
/// Returns `ServerError::Bind` if `addr` cannot be bound, or
/// `ServerError::Io` if serving fails
pub async fn serve_ws(handler: Arc<McpHandler>, addr: SocketAddr) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    info!(%addr, "Serving MCP over WebSocket (GET /ws)");
    axum::serve(listener, router(handler)).await?;
    Ok(())
}

#[allow(clippy::unused_async)] // Axum handler signature requires async
async fn upgrade(ws: WebSocketUpgrade, State(handler): State<Arc<McpHandler>>) -> Response {
    info!("WebSocket connection requested");
    ws.on_upgrade(move |socket| handle_socket(socket, handler))
}

async fn handle_socket(socket: WebSocket, handler: Arc<McpHandler>) {
    info!("WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<OutgoingMessage>();

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, "Failed to serialize message");
                    continue;
                }
            };

            if sender.send(Message::Text(text)).await.is_err() {
                // Client disconnected
                break;
            }
        }

        debug!("WebSocket send task terminated");
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => {
                    let handler = Arc::clone(&handler);
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        if let Some(response) = handler.handle_message(&text, Some(&tx)).await {
                            // Receiver gone means the socket closed
                            let _ = tx.send(OutgoingMessage::Response(response));
                        }
                    });
                }
                Message::Binary(_) => warn!("Ignoring binary WebSocket frame"),
                Message::Close(_) => {
                    debug!("Client closed WebSocket");
                    break;
                }
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("WebSocket connection closed");
}
