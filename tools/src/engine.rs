//! Resilient request engine
//!
//! [`ResilientClient::request`] performs one logical API call:
//!
//! 1. classify the URL into a [`RequestPolicy`](crate::policy::RequestPolicy)
//! 2. run attempts through the [`RetrySchedule`] state machine
//! 3. resolve to the parsed JSON payload, or `None` once retries are spent or
//!    a client error makes retrying pointless
//!
//! The engine never returns an error. Failures are logged with `tracing` and
//! counted through `metrics`; callers only see the absence of a payload.
//! Dropping the returned future cancels the in-flight attempt or backoff.

use crate::config::RequestConfig;
use crate::policy::EndpointClass;
use crate::retry::{RetryEvent, RetrySchedule, RetryState};
use crate::transport::{ApiRequest, HttpTransport, ReqwestTransport, TransportError};
use mcp_integration_core::progress::{ProgressReporter, report};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Why a single attempt failed
#[derive(Debug, Error)]
pub enum RequestError {
    /// The attempt exceeded its timeout
    #[error("Request timed out after {0:?}")]
    TimedOut(Duration),

    /// The server answered with an error status
    #[error("HTTP error {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// No response was obtained
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The body was not valid JSON
    #[error("Invalid JSON response: {0}")]
    Decode(String),
}

impl RequestError {
    /// State machine event for this failure
    #[must_use]
    pub fn event(&self) -> RetryEvent {
        match self {
            Self::TimedOut(_) => RetryEvent::TimedOut,
            Self::Status { status, .. } if (400..500).contains(status) => {
                RetryEvent::ClientError(*status)
            }
            Self::Status { .. } | Self::Transport(_) | Self::Decode(_) => RetryEvent::Failed,
        }
    }
}

/// HTTP client with per-endpoint timeout and retry policy
#[derive(Debug, Clone)]
pub struct ResilientClient<T = ReqwestTransport> {
    transport: T,
    config: RequestConfig,
}

impl ResilientClient<ReqwestTransport> {
    /// Create a reqwest-backed client
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Configuration` if the user agent is invalid
    pub fn with_user_agent(user_agent: &str, config: RequestConfig) -> Result<Self, TransportError> {
        Ok(Self::new(ReqwestTransport::new(user_agent)?, config))
    }
}

impl<T: HttpTransport> ResilientClient<T> {
    /// Create a client over any transport
    #[must_use]
    pub const fn new(transport: T, config: RequestConfig) -> Self {
        Self { transport, config }
    }

    /// Engine configuration
    #[must_use]
    pub const fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Perform `request` with retries, returning the parsed payload or `None`
    pub async fn request(
        &self,
        request: &ApiRequest,
        progress: Option<&dyn ProgressReporter>,
    ) -> Option<Value> {
        let schedule = RetrySchedule::new(self.config.classify(&request.url), &self.config);
        let max_retries = schedule.policy().max_retries;
        let class = class_label(schedule.policy().class);
        let url = request.url.as_str();

        report(progress, format!("Starting request to {url}"));
        metrics::counter!("mcp_http_requests_total", "class" => class).increment(1);

        let mut state = schedule.start();
        let mut payload = None;
        let mut last_error: Option<RequestError> = None;

        loop {
            state = match state {
                RetryState::Attempting { attempt, timeout } => {
                    if attempt > 0 {
                        report(
                            progress,
                            format!("Retry attempt {attempt}/{max_retries} for {url}"),
                        );
                        metrics::counter!("mcp_http_retries_total", "class" => class).increment(1);
                    }
                    report(progress, format!("Connecting to {url}"));

                    match self.attempt(request, timeout, progress).await {
                        Ok(value) => {
                            payload = Some(value);
                            schedule.transition(state, RetryEvent::Succeeded)
                        }
                        Err(e) => {
                            warn!(
                                url,
                                method = %request.method,
                                attempt = attempt.saturating_add(1),
                                max_attempts = schedule.policy().max_attempts(),
                                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                                error = %e,
                                "Request attempt failed"
                            );
                            let event = e.event();
                            last_error = Some(e);
                            schedule.transition(state, event)
                        }
                    }
                }
                RetryState::WaitingBackoff { delay, .. } => {
                    report(progress, format!("Waiting {} before retry", describe_wait(delay)));
                    tokio::time::sleep(delay).await;
                    schedule.transition(state, RetryEvent::BackoffElapsed)
                }
                RetryState::Succeeded => {
                    debug!(url, "Request succeeded");
                    return payload;
                }
                RetryState::ExhaustedRetries => {
                    error!(
                        url,
                        attempts = schedule.policy().max_attempts(),
                        last_error = ?last_error,
                        "Maximum retries reached"
                    );
                    metrics::counter!("mcp_http_failures_total", "class" => class, "reason" => "exhausted")
                        .increment(1);
                    return None;
                }
                RetryState::Abandoned { status } => {
                    warn!(
                        url,
                        status,
                        last_error = ?last_error,
                        "Client error, not retrying"
                    );
                    metrics::counter!("mcp_http_failures_total", "class" => class, "reason" => "client_error")
                        .increment(1);
                    return None;
                }
            };
        }
    }

    async fn attempt(
        &self,
        request: &ApiRequest,
        timeout: Duration,
        progress: Option<&dyn ProgressReporter>,
    ) -> Result<Value, RequestError> {
        let response = tokio::time::timeout(timeout, self.transport.send(request))
            .await
            .map_err(|_| RequestError::TimedOut(timeout))??;

        report(
            progress,
            format!(
                "Received response from {} with status {}",
                request.url, response.status
            ),
        );

        if response.status >= 400 {
            return Err(RequestError::Status {
                status: response.status,
                body: response.body,
            });
        }

        serde_json::from_str(&response.body).map_err(|e| RequestError::Decode(e.to_string()))
    }
}

const fn class_label(class: EndpointClass) -> &'static str {
    match class {
        EndpointClass::Slow => "slow",
        EndpointClass::Fast => "fast",
    }
}

fn describe_wait(delay: Duration) -> String {
    if delay.subsec_nanos() == 0 {
        format!("{}s", delay.as_secs())
    } else {
        format!("{}ms", delay.as_millis())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)] // Test code can use expect
mod tests {
    use super::*;
    use crate::mock::{MockResponse, MockTransport, RecordingProgress};
    use serde_json::json;
    use std::sync::Arc;

    const SLOW_URL: &str = "http://backend/api/search";
    const FAST_URL: &str = "http://api.weatherapi.com/v1/current.json";

    fn fast_backoff() -> RequestConfig {
        RequestConfig::default().with_backoff_base(Duration::from_millis(1))
    }

    fn client(transport: &Arc<MockTransport>, config: RequestConfig) -> ResilientClient<Arc<MockTransport>> {
        ResilientClient::new(Arc::clone(transport), config)
    }

    #[tokio::test]
    async fn test_success_returns_payload() {
        let transport = Arc::new(MockTransport::always(MockResponse::json(200, json!({"ok": true}))));
        let progress = RecordingProgress::new();

        let result = client(&transport, fast_backoff())
            .request(&ApiRequest::get(FAST_URL), Some(&progress))
            .await;

        assert_eq!(result, Some(json!({"ok": true})));
        assert_eq!(transport.call_count(), 1);
        assert_eq!(
            progress.messages(),
            vec![
                format!("Starting request to {FAST_URL}"),
                format!("Connecting to {FAST_URL}"),
                format!("Received response from {FAST_URL} with status 200"),
            ]
        );
    }

    #[tokio::test]
    async fn test_always_503_exhausts_slow_budget() {
        let transport = Arc::new(MockTransport::always(MockResponse::status(503, "unavailable")));
        let progress = RecordingProgress::new();

        let result = client(&transport, fast_backoff())
            .request(&ApiRequest::get(SLOW_URL), Some(&progress))
            .await;

        assert_eq!(result, None);
        assert_eq!(transport.call_count(), 4);

        let messages = progress.messages();
        assert!(messages.contains(&format!("Retry attempt 1/3 for {SLOW_URL}")));
        assert!(messages.contains(&format!("Retry attempt 3/3 for {SLOW_URL}")));
        assert!(!messages.iter().any(|m| m.contains("Retry attempt 4")));
    }

    #[tokio::test]
    async fn test_404_is_not_retried() {
        let transport = Arc::new(MockTransport::always(MockResponse::status(404, "not found")));

        let result = client(&transport, fast_backoff())
            .request(&ApiRequest::get(SLOW_URL), None)
            .await;

        assert_eq!(result, None);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_server_error() {
        let transport = Arc::new(MockTransport::sequence(
            vec![MockResponse::status(502, "bad gateway")],
            MockResponse::json(200, json!({"value": 1})),
        ));

        let result = client(&transport, fast_backoff())
            .request(&ApiRequest::get(SLOW_URL), None)
            .await;

        assert_eq!(result, Some(json!({"value": 1})));
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_fast_endpoint_gets_single_attempt() {
        let transport = Arc::new(MockTransport::always(MockResponse::status(500, "boom")));

        let result = client(&transport, fast_backoff())
            .request(&ApiRequest::get(FAST_URL), None)
            .await;

        assert_eq!(result, None);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_and_network_errors_are_retried() {
        let transport = Arc::new(MockTransport::sequence(
            vec![
                MockResponse::status(200, "<html>not json</html>"),
                MockResponse::error(TransportError::Request("connection reset".to_string())),
            ],
            MockResponse::json(200, json!([1, 2, 3])),
        ));

        let result = client(&transport, fast_backoff())
            .request(&ApiRequest::get(SLOW_URL), None)
            .await;

        assert_eq!(result, Some(json!([1, 2, 3])));
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_oversized_body_is_retried_then_abandoned() {
        let transport = Arc::new(MockTransport::always(MockResponse::error(TransportError::TooLarge)));
        let progress = RecordingProgress::new();

        let result = client(&transport, fast_backoff())
            .request(&ApiRequest::get(SLOW_URL), Some(&progress))
            .await;

        assert!(result.is_none());
        assert_eq!(transport.call_count(), 4);
        assert!(progress.messages().iter().any(|m| m.contains("Retry attempt 3/3")));
    }

    #[tokio::test]
    async fn test_post_forwards_body() {
        let transport = Arc::new(MockTransport::always(MockResponse::json(200, json!({"stdout": "1"}))));
        let request = ApiRequest::post("http://executor/run", json!({"code": "print(1)"}));

        let result = client(&transport, fast_backoff()).request(&request, None).await;

        assert!(result.is_some());
        assert_eq!(transport.requests(), vec![request]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_double_in_seconds() {
        let transport = Arc::new(MockTransport::always(MockResponse::status(503, "unavailable")));
        let progress = RecordingProgress::new();

        let result = client(&transport, RequestConfig::default())
            .request(&ApiRequest::get(SLOW_URL), Some(&progress))
            .await;

        assert_eq!(result, None);
        let waits: Vec<String> = progress
            .messages()
            .into_iter()
            .filter(|m| m.starts_with("Waiting"))
            .collect();
        assert_eq!(
            waits,
            vec![
                "Waiting 2s before retry",
                "Waiting 4s before retry",
                "Waiting 8s before retry"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_backend_times_out_every_attempt() {
        let transport = Arc::new(MockTransport::always(MockResponse::Hang));
        let started = tokio::time::Instant::now();

        let result = client(&transport, RequestConfig::default())
            .request(&ApiRequest::get(SLOW_URL), None)
            .await;

        assert_eq!(result, None);
        assert_eq!(transport.call_count(), 4);
        // 120 + 180 + 270 + 405 seconds of timeouts plus 2 + 4 + 8 of backoff
        assert!(started.elapsed() >= Duration::from_secs(989));
    }

    #[test]
    fn test_request_error_events() {
        assert_eq!(
            RequestError::TimedOut(Duration::from_secs(1)).event(),
            RetryEvent::TimedOut
        );
        assert_eq!(
            RequestError::Status { status: 429, body: String::new() }.event(),
            RetryEvent::ClientError(429)
        );
        assert_eq!(
            RequestError::Status { status: 503, body: String::new() }.event(),
            RetryEvent::Failed
        );
        assert_eq!(RequestError::Decode("eof".to_string()).event(), RetryEvent::Failed);
    }

    #[test]
    fn test_describe_wait() {
        assert_eq!(describe_wait(Duration::from_secs(4)), "4s");
        assert_eq!(describe_wait(Duration::from_millis(2)), "2ms");
    }
}
