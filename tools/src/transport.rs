//! HTTP transport seam for the resilient request engine
//!
//! The engine talks to backends through [`HttpTransport`], so tests can swap
//! in a scripted transport. [`ReqwestTransport`] is the production
//! implementation: static user agent, `Accept: application/json`, query
//! parameters for GET, JSON body for POST, response bodies capped at 50MB.

use futures::StreamExt;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use std::future::Future;
use thiserror::Error;

/// Maximum response size (50MB)
pub const MAX_RESPONSE_SIZE: usize = 50 * 1024 * 1024;

/// HTTP method supported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET with query parameters
    Get,
    /// POST with a JSON body
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// One outbound API request
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Absolute URL
    pub url: String,
    /// HTTP method
    pub method: Method,
    /// Query parameters (sent for GET)
    pub params: Vec<(String, String)>,
    /// JSON body (sent for POST)
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// GET request without parameters
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            params: Vec::new(),
            body: None,
        }
    }

    /// POST request with a JSON body
    #[must_use]
    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            method: Method::Post,
            params: Vec::new(),
            body: Some(body),
        }
    }

    /// Append a query parameter
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }
}

/// Raw response as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body (lossy UTF-8)
    pub body: String,
}

/// Transport-level failures (no HTTP status was obtained)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection, DNS or protocol failure
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// Body could not be read
    #[error("Failed to read response: {0}")]
    Body(String),

    /// Body exceeded the size cap
    #[error("Response too large (>{MAX_RESPONSE_SIZE} bytes)")]
    TooLarge,

    /// Client could not be constructed
    #[error("Invalid client configuration: {0}")]
    Configuration(String),
}

/// Sends one request and returns the raw response
///
/// Timeouts are enforced by the caller, so implementations may wait
/// indefinitely.
pub trait HttpTransport: Send + Sync {
    /// Perform the request
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if no HTTP response could be obtained
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

impl<T: HttpTransport> HttpTransport for std::sync::Arc<T> {
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send {
        (**self).send(request)
    }
}

/// `reqwest`-backed transport
///
/// The inner client is shared across requests for connection reuse only;
/// it carries no per-request state.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport sending `user_agent` and `Accept: application/json`
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Configuration` if the user agent is not a
    /// valid header value or the client cannot be built
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| TransportError::Configuration(e.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| TransportError::Configuration(e.to_string()))?;

        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url).query(&request.params),
            Method::Post => {
                let builder = self.client.post(&request.url);
                match &request.body {
                    Some(body) => builder.json(body),
                    None => builder,
                }
            }
        };

        async move {
            let response = builder
                .send()
                .await
                .map_err(|e| TransportError::Request(e.to_string()))?;

            let status = response.status().as_u16();

            // Stream response with size limit
            let mut body_bytes = Vec::new();
            let mut stream = response.bytes_stream();

            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| TransportError::Body(e.to_string()))?;

                if body_bytes.len() + chunk.len() > MAX_RESPONSE_SIZE {
                    return Err(TransportError::TooLarge);
                }

                body_bytes.extend_from_slice(&chunk);
            }

            Ok(TransportResponse {
                status,
                body: String::from_utf8_lossy(&body_bytes).into_owned(),
            })
        }
    }
}
