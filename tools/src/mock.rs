//! Test doubles for the request engine and tools
//!
//! - [`MockTransport`]: scripted [`HttpTransport`] recording every request
//! - [`RecordingProgress`]: [`ProgressReporter`] keeping every event
//!
//! Neither touches the network.

use crate::transport::{ApiRequest, HttpTransport, TransportError, TransportResponse};
use mcp_integration_core::progress::{ProgressEvent, ProgressReporter};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One scripted transport reply
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// HTTP response with a raw body
    Reply {
        /// Status code
        status: u16,
        /// Body text
        body: String,
    },
    /// Transport failure (no HTTP response)
    Error(TransportError),
    /// Never completes; exercises timeouts
    Hang,
}

impl MockResponse {
    /// Response with a JSON body
    #[must_use]
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::Reply {
            status,
            body: body.to_string(),
        }
    }

    /// Response with a plain body
    #[must_use]
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Reply {
            status,
            body: body.into(),
        }
    }

    /// Transport failure
    #[must_use]
    pub const fn error(error: TransportError) -> Self {
        Self::Error(error)
    }
}

/// Scripted transport
///
/// Replies are consumed in order; once the script is empty every further
/// call gets the fallback reply.
#[derive(Debug)]
pub struct MockTransport {
    script: Mutex<VecDeque<MockResponse>>,
    fallback: MockResponse,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    /// Transport answering every call with `response`
    #[must_use]
    pub fn always(response: MockResponse) -> Self {
        Self::sequence(Vec::new(), response)
    }

    /// Transport replaying `script`, then answering with `fallback`
    #[must_use]
    pub fn sequence(script: Vec<MockResponse>, fallback: MockResponse) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request received so far
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.requests).clone()
    }

    /// Number of requests received so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

impl HttpTransport for MockTransport {
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send {
        lock(&self.requests).push(request.clone());
        let response = lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        async move {
            match response {
                MockResponse::Reply { status, body } => Ok(TransportResponse { status, body }),
                MockResponse::Error(error) => Err(error),
                MockResponse::Hang => std::future::pending().await,
            }
        }
    }
}

/// Progress reporter keeping every event in memory
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    /// Empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events in emission order
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        lock(&self.events).clone()
    }

    /// Recorded messages in emission order
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        lock(&self.events).iter().map(|e| e.message.clone()).collect()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        lock(&self.events).push(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
