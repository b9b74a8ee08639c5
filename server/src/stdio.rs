//! Newline-delimited JSON-RPC over stdin/stdout
//!
//! Each line is one message. Requests run concurrently; a single writer task
//! owns the output so responses and progress notifications never interleave
//! mid-line. End of input is a clean shutdown once in-flight calls finish.

use crate::error::ServerError;
use crate::protocol::{McpHandler, OutgoingMessage};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Serve the process's stdin/stdout
///
/// # Errors
///
/// Returns `ServerError::Io` if stdin cannot be read or stdout written
pub async fn serve_stdio(handler: Arc<McpHandler>) -> Result<(), ServerError> {
    info!("Serving MCP over stdio");
    serve_lines(handler, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

/// Serve newline-delimited messages from `reader`, answering on `writer`
///
/// # Errors
///
/// Returns `ServerError::Io` on read or write failure
pub async fn serve_lines<R, W>(handler: Arc<McpHandler>, reader: R, writer: W) -> Result<(), ServerError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let writer_task = tokio::spawn(write_messages(rx, writer));

    let mut calls = JoinSet::new();
    let mut lines = reader.lines();

    let read_result = loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => {
                let handler = Arc::clone(&handler);
                let tx = tx.clone();
                calls.spawn(async move {
                    let Some(response) = handler.handle_message(&line, Some(&tx)).await else {
                        return;
                    };
                    if tx.send(OutgoingMessage::Response(response)).is_err() {
                        debug!("Output closed before response was written");
                    }
                });
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    while calls.join_next().await.is_some() {}
    drop(tx);

    let write_result = writer_task.await.map_err(io::Error::other)?;
    read_result?;
    write_result?;

    info!("stdin closed, stdio transport finished");
    Ok(())
}

async fn write_messages<W>(mut rx: mpsc::UnboundedReceiver<OutgoingMessage>, mut writer: W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        let mut line = serde_json::to_string(&message).map_err(io::Error::other)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
