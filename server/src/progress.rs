//! Progress forwarding as `notifications/progress`

use crate::protocol::{JsonRpcNotification, Notifier, OutgoingMessage};
use mcp_integration_core::progress::{ProgressEvent, ProgressReporter};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Forwards progress events to the client that issued the call
///
/// Each event increments the `progress` counter. A closed connection is
/// ignored; the tool keeps running.
#[derive(Debug)]
pub struct NotificationProgress {
    token: Value,
    notifier: Notifier,
    sent: AtomicU64,
}

impl NotificationProgress {
    /// Reporter for the call identified by `token`
    #[must_use]
    pub const fn new(token: Value, notifier: Notifier) -> Self {
        Self {
            token,
            notifier,
            sent: AtomicU64::new(0),
        }
    }
}

impl ProgressReporter for NotificationProgress {
    fn report(&self, event: ProgressEvent) {
        let progress = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        let notification = JsonRpcNotification::new(
            "notifications/progress",
            json!({
                "progressToken": self.token,
                "progress": progress,
                "message": event.message,
            }),
        );

        if self
            .notifier
            .send(OutgoingMessage::Notification(notification))
            .is_err()
        {
            debug!("Progress receiver closed");
        }
    }
}
