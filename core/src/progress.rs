//! Progress reporting for tool invocations
//!
//! Progress is a fire-and-forget side channel: reporters observe lifecycle
//! checkpoints (start, connect, retry, completion) but can never influence
//! control flow. A missing reporter is silently ignored.
//!
//! ## Example
//!
//! ```
//! use mcp_integration_core::progress::{report, ProgressEvent, ProgressReporter};
//!
//! struct Stdout;
//!
//! impl ProgressReporter for Stdout {
//!     fn report(&self, event: ProgressEvent) {
//!         println!("{}", event.message);
//!     }
//! }
//!
//! report(Some(&Stdout), "Starting request");
//! report(None, "nobody listening");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A timestamped, free-text status update
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// When the event was emitted
    pub timestamp: DateTime<Utc>,
    /// Status message
    pub message: String,
}

impl ProgressEvent {
    /// Create an event stamped with the current time
    #[must_use]
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
        }
    }
}

/// Sink for progress events
///
/// Implementations must not block and must swallow their own failures.
pub trait ProgressReporter: Send + Sync {
    /// Observe one progress event
    fn report(&self, event: ProgressEvent);
}

impl<F> ProgressReporter for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event);
    }
}

/// Emit `message` to `reporter` if one is attached
pub fn report(reporter: Option<&dyn ProgressReporter>, message: impl Into<String>) {
    if let Some(reporter) = reporter {
        reporter.report(ProgressEvent::now(message));
    }
}

/// Reporter that writes every event to the `tracing` log
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn report(&self, event: ProgressEvent) {
        tracing::info!(at = %event.timestamp, "PROGRESS: {}", event.message);
    }
}

/// Reporter that forwards events into an unbounded channel
///
/// Send errors (receiver dropped) are ignored.
#[derive(Clone, Debug)]
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    /// Create a reporter and the receiving half of its channel
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressReporter for ChannelProgress {
    fn report(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}
