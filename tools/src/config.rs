//! Request and backend configuration.
//!
//! Timeouts, retry budgets, base URLs and the API key are passed into the
//! engine and the tools at construction. Nothing here is process-global.

use std::time::Duration;
use thiserror::Error;

/// Default WeatherAPI.com base URL
pub const DEFAULT_WEATHER_API_BASE: &str = "http://api.weatherapi.com/v1";

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "mcp-integration/1.0";

/// Keywords marking an endpoint as slow
pub const DEFAULT_SLOW_KEYWORDS: [&str; 5] = ["enhance", "playwright", "masa", "search", "execute"];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing `WEATHER_API_KEY` environment variable
    #[error("Missing WEATHER_API_KEY environment variable")]
    MissingApiKey,

    /// An environment variable holds an unusable value
    #[error("Invalid value for {name}: {value}")]
    InvalidValue {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },
}

/// Timeout and retry settings for the resilient request engine.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Timeout for fast endpoints.
    ///
    /// Default: 60 seconds
    pub base_timeout: Duration,

    /// Initial timeout for slow endpoints.
    ///
    /// Default: 120 seconds
    pub slow_timeout: Duration,

    /// Retries granted to fast endpoints (0 = single attempt).
    pub fast_max_retries: u32,

    /// Retries granted to slow endpoints.
    ///
    /// Default: 3
    pub slow_max_retries: u32,

    /// URL substrings that classify an endpoint as slow.
    pub slow_keywords: Vec<String>,

    /// Factor applied to the timeout after an attempt times out.
    ///
    /// Default: 1.5
    pub timeout_multiplier: f64,

    /// Unit of the exponential backoff; retry `n` waits `backoff_base * 2^n`.
    ///
    /// Default: 1 second
    pub backoff_base: Duration,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            base_timeout: Duration::from_secs(60),
            slow_timeout: Duration::from_secs(120),
            fast_max_retries: 0,
            slow_max_retries: 3,
            slow_keywords: DEFAULT_SLOW_KEYWORDS.iter().map(ToString::to_string).collect(),
            timeout_multiplier: 1.5,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RequestConfig {
    /// Set the fast-endpoint timeout
    #[must_use]
    pub const fn with_base_timeout(mut self, timeout: Duration) -> Self {
        self.base_timeout = timeout;
        self
    }

    /// Set the slow-endpoint timeout
    #[must_use]
    pub const fn with_slow_timeout(mut self, timeout: Duration) -> Self {
        self.slow_timeout = timeout;
        self
    }

    /// Set the slow-endpoint retry budget
    #[must_use]
    pub const fn with_slow_max_retries(mut self, retries: u32) -> Self {
        self.slow_max_retries = retries;
        self
    }

    /// Set the backoff unit
    #[must_use]
    pub const fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Replace the slow keyword set
    #[must_use]
    pub fn with_slow_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.slow_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// Weather provider settings.
#[derive(Clone)]
pub struct WeatherConfig {
    /// Base URL, without trailing slash (e.g. `http://api.weatherapi.com/v1`)
    pub base_url: String,
    /// API key appended to every call as `key`
    pub api_key: String,
    /// User agent header value
    pub user_agent: String,
}

impl std::fmt::Debug for WeatherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl WeatherConfig {
    /// Create a configuration for the default provider URL.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_WEATHER_API_BASE.to_string(),
            api_key: api_key.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Load from `WEATHER_API_KEY`, `WEATHER_API_BASE` and `USER_AGENT`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingApiKey` if `WEATHER_API_KEY` is unset or
    /// `ConfigError::InvalidValue` if `WEATHER_API_BASE` is not an http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("WEATHER_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::new(api_key);

        if let Ok(base_url) = std::env::var("WEATHER_API_BASE") {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    name: "WEATHER_API_BASE",
                    value: base_url,
                });
            }
            config = config.with_base_url(base_url);
        }

        if let Ok(user_agent) = std::env::var("USER_AGENT") {
            config.user_agent = user_agent;
        }

        Ok(config)
    }

    /// Set base URL (trailing slashes are stripped)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set user agent
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Full URL for a provider endpoint such as `current.json`
    #[must_use]
    pub fn endpoint(&self, name: &str) -> String {
        format!("{}/{name}", self.base_url)
    }
}
