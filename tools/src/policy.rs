//! Request policy classification
//!
//! Endpoints whose URL contains a slow keyword get a larger timeout and a
//! retry budget; every other endpoint gets a single attempt at the base
//! timeout.

use crate::config::RequestConfig;
use std::time::Duration;

/// Latency class of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointClass {
    /// Known high-latency operation (search, enhancement, code execution)
    Slow,
    /// Everything else
    Fast,
}

/// Timeout budget and retry count for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPolicy {
    /// Latency class the policy was derived from
    pub class: EndpointClass,
    /// Timeout for the first attempt
    pub timeout: Duration,
    /// Retries after the first attempt (total attempts = `max_retries + 1`)
    pub max_retries: u32,
}

impl RequestPolicy {
    /// Total number of attempts this policy allows
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl RequestConfig {
    /// Classify `url` as slow or fast and return its policy
    #[must_use]
    pub fn classify(&self, url: &str) -> RequestPolicy {
        if self.slow_keywords.iter().any(|keyword| url.contains(keyword.as_str())) {
            RequestPolicy {
                class: EndpointClass::Slow,
                timeout: self.slow_timeout,
                max_retries: self.slow_max_retries,
            }
        } else {
            RequestPolicy {
                class: EndpointClass::Fast,
                timeout: self.base_timeout,
                max_retries: self.fast_max_retries,
            }
        }
    }
}

/// Classify `url` with the default configuration
#[must_use]
pub fn classify(url: &str) -> RequestPolicy {
    RequestConfig::default().classify(url)
}
