//! Weather tools backed by a WeatherAPI.com-compatible provider
//!
//! Provides five tools:
//! - `get_current_weather`: current conditions for a location
//! - `get_weather_forecast`: 1–7 day forecast
//! - `get_weather_alerts`: active alerts for an area
//! - `search_locations`: location lookup by partial name
//! - `get_time_zone`: time zone and local time for a location
//!
//! Every endpoint validates its input before any request, reports progress,
//! and answers with plain text. A backend failure becomes a fixed message
//! naming the input; it is never raised to the protocol layer.

use crate::config::{RequestConfig, WeatherConfig};
use crate::engine::ResilientClient;
use crate::format::{
    format_alerts, format_current_conditions, format_forecast, format_locations,
    format_time_zone, validate_days,
};
use crate::registry::ToolRegistry;
use crate::transport::{ApiRequest, HttpTransport, ReqwestTransport, TransportError};
use mcp_integration_core::progress::{ProgressReporter, report};
use mcp_integration_core::tool::{ProgressHandle, Tool, ToolError, ToolExecutorFn, ToolFuture};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;

/// Default forecast length
const DEFAULT_FORECAST_DAYS: i64 = 3;

/// Weather endpoints sharing one resilient client
#[derive(Debug)]
pub struct WeatherTools<T = ReqwestTransport> {
    client: ResilientClient<T>,
    config: WeatherConfig,
}

impl WeatherTools<ReqwestTransport> {
    /// Build reqwest-backed weather tools
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Configuration` if the configured user agent
    /// is not a valid header value
    pub fn from_config(config: WeatherConfig, request: RequestConfig) -> Result<Self, TransportError> {
        let client = ResilientClient::with_user_agent(&config.user_agent, request)?;
        Ok(Self::new(client, config))
    }
}

impl<T: HttpTransport> WeatherTools<T> {
    /// Create weather tools over an existing client
    #[must_use]
    pub const fn new(client: ResilientClient<T>, config: WeatherConfig) -> Self {
        Self { client, config }
    }

    /// Current conditions for `location`
    pub async fn current_weather(
        &self,
        location: &str,
        progress: Option<&dyn ProgressReporter>,
    ) -> String {
        report(progress, format!("Requesting current weather for: {location}"));

        let data = self
            .fetch(self.query("current.json", location), progress)
            .await
            .filter(|data| data.get("location").is_some() && data.get("current").is_some());

        let Some(data) = data else {
            report(progress, format!("Failed to get current weather for {location}"));
            return format!(
                "Could not retrieve weather for '{location}'. Please check the location and try again."
            );
        };

        report(progress, "Completed");
        format_current_conditions(&data).into_text()
    }

    /// `days`-day forecast for `location`
    ///
    /// An out-of-range `days` is answered without contacting the backend.
    pub async fn forecast(
        &self,
        location: &str,
        days: i64,
        progress: Option<&dyn ProgressReporter>,
    ) -> String {
        let days = match validate_days(days) {
            Ok(days) => days,
            Err(message) => {
                report(progress, "Invalid days parameter");
                return message.to_string();
            }
        };

        report(progress, format!("Requesting {days}-day forecast for: {location}"));

        let request = self
            .query("forecast.json", location)
            .param("days", days)
            .param("aqi", "no")
            .param("alerts", "no");

        let data = self.fetch(request, progress).await.filter(|data| {
            data.get("forecast")
                .and_then(|forecast| forecast.get("forecastday"))
                .is_some()
        });

        let Some(data) = data else {
            report(progress, format!("Failed to get weather forecast for {location}"));
            return format!("Could not retrieve forecast for '{location}'.");
        };

        report(progress, "Completed");
        format_forecast(&data, i64::from(days)).into_text()
    }

    /// Active weather alerts for `area`
    pub async fn alerts(&self, area: &str, progress: Option<&dyn ProgressReporter>) -> String {
        report(progress, format!("Checking weather alerts for: {area}"));

        let request = self
            .query("forecast.json", area)
            .param("days", 1)
            .param("alerts", "yes");

        let Some(data) = self.fetch(request, progress).await else {
            report(progress, format!("Failed to get weather alerts for {area}"));
            return format!("Could not retrieve weather alerts for '{area}'.");
        };

        report(progress, "Completed");
        format_alerts(area, &data).into_text()
    }

    /// Locations matching `query`
    pub async fn search_locations(
        &self,
        query: &str,
        progress: Option<&dyn ProgressReporter>,
    ) -> String {
        report(progress, format!("Searching for locations matching '{query}'"));

        let Some(data) = self.fetch(self.query("search.json", query), progress).await else {
            report(progress, format!("Location search failed for '{query}'"));
            return format!("Could not search locations matching '{query}'.");
        };

        report(progress, "Search completed");
        format_locations(query, &data).into_text()
    }

    /// Time zone information for `location`
    pub async fn time_zone(&self, location: &str, progress: Option<&dyn ProgressReporter>) -> String {
        report(progress, format!("Fetching timezone data for {location}"));

        let data = self
            .fetch(self.query("timezone.json", location), progress)
            .await
            .filter(|data| data.get("location").is_some());

        let Some(data) = data else {
            report(progress, format!("Failed to get timezone information for {location}"));
            return format!("Could not retrieve time zone for '{location}'.");
        };

        report(progress, "Completed");
        format_time_zone(&data).into_text()
    }

    fn query(&self, endpoint: &str, location: &str) -> ApiRequest {
        ApiRequest::get(self.config.endpoint(endpoint)).param("q", location)
    }

    async fn fetch(
        &self,
        request: ApiRequest,
        progress: Option<&dyn ProgressReporter>,
    ) -> Option<Value> {
        let request = request.param("key", &self.config.api_key);
        self.client.request(&request, progress).await
    }
}

#[derive(Debug, Deserialize)]
struct LocationInput {
    #[serde(alias = "q")]
    location: String,
}

#[derive(Debug, Deserialize)]
struct ForecastInput {
    #[serde(alias = "q")]
    location: String,
    #[serde(default = "default_days")]
    days: i64,
}

const fn default_days() -> i64 {
    DEFAULT_FORECAST_DAYS
}

#[derive(Debug, Deserialize)]
struct AreaInput {
    area: String,
}

#[derive(Debug, Deserialize)]
struct SearchInput {
    #[serde(alias = "q")]
    query: String,
}

/// Wrap a typed handler into a [`ToolExecutorFn`]
///
/// Malformed arguments become a `ToolError`; everything else is text.
fn executor<T, A, F, Fut>(tools: Arc<WeatherTools<T>>, handler: F) -> ToolExecutorFn
where
    T: HttpTransport + 'static,
    A: DeserializeOwned + Send + 'static,
    F: Fn(Arc<WeatherTools<T>>, A, ProgressHandle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = String> + Send + 'static,
{
    Arc::new(move |input: String, progress: ProgressHandle| {
        let call = serde_json::from_str::<A>(&input)
            .map(|args| handler(Arc::clone(&tools), args, progress));

        Box::pin(async move {
            match call {
                Ok(call) => Ok(call.await),
                Err(e) => Err(ToolError::new(format!("Invalid input JSON: {e}"))),
            }
        }) as ToolFuture
    })
}

/// Create the `get_current_weather` tool
#[must_use]
pub fn current_weather_tool<T: HttpTransport + 'static>(
    tools: Arc<WeatherTools<T>>,
) -> (Tool, ToolExecutorFn) {
    let tool = Tool {
        name: "get_current_weather".to_string(),
        description: "Get the current weather for a location".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "Location query (city name, lat/lon, IP address, US zip, UK postcode)"
                }
            },
            "required": ["location"]
        }),
    };

    let executor = executor(tools, |tools, input: LocationInput, progress| async move {
        tools.current_weather(&input.location, progress.as_deref()).await
    });

    (tool, executor)
}

/// Create the `get_weather_forecast` tool
#[must_use]
pub fn forecast_tool<T: HttpTransport + 'static>(
    tools: Arc<WeatherTools<T>>,
) -> (Tool, ToolExecutorFn) {
    let tool = Tool {
        name: "get_weather_forecast".to_string(),
        description: "Get a multi-day weather forecast for a location (1-7 days)".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "Location query (city name, lat/lon, IP address, US zip, UK postcode)"
                },
                "days": {
                    "type": "integer",
                    "description": "Number of forecast days (1-7)",
                    "minimum": 1,
                    "maximum": 7,
                    "default": DEFAULT_FORECAST_DAYS
                }
            },
            "required": ["location"]
        }),
    };

    let executor = executor(tools, |tools, input: ForecastInput, progress| async move {
        tools
            .forecast(&input.location, input.days, progress.as_deref())
            .await
    });

    (tool, executor)
}

/// Create the `get_weather_alerts` tool
#[must_use]
pub fn alerts_tool<T: HttpTransport + 'static>(
    tools: Arc<WeatherTools<T>>,
) -> (Tool, ToolExecutorFn) {
    let tool = Tool {
        name: "get_weather_alerts".to_string(),
        description: "Get active weather alerts for a location, if any".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "area": {
                    "type": "string",
                    "description": "Area to check for alerts (city name or coordinates)"
                }
            },
            "required": ["area"]
        }),
    };

    let executor = executor(tools, |tools, input: AreaInput, progress| async move {
        tools.alerts(&input.area, progress.as_deref()).await
    });

    (tool, executor)
}

/// Create the `search_locations` tool
#[must_use]
pub fn search_locations_tool<T: HttpTransport + 'static>(
    tools: Arc<WeatherTools<T>>,
) -> (Tool, ToolExecutorFn) {
    let tool = Tool {
        name: "search_locations".to_string(),
        description: "Search for locations by full or partial name".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Location search query (city or partial name)"
                }
            },
            "required": ["query"]
        }),
    };

    let executor = executor(tools, |tools, input: SearchInput, progress| async move {
        tools.search_locations(&input.query, progress.as_deref()).await
    });

    (tool, executor)
}

/// Create the `get_time_zone` tool
#[must_use]
pub fn time_zone_tool<T: HttpTransport + 'static>(
    tools: Arc<WeatherTools<T>>,
) -> (Tool, ToolExecutorFn) {
    let tool = Tool {
        name: "get_time_zone".to_string(),
        description: "Get time zone and local time for a location".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "Location query (city name, lat/lon, IP address, US zip, UK postcode)"
                }
            },
            "required": ["location"]
        }),
    };

    let executor = executor(tools, |tools, input: LocationInput, progress| async move {
        tools.time_zone(&input.location, progress.as_deref()).await
    });

    (tool, executor)
}

/// Register every weather tool with `registry`
pub fn register_weather_tools<T: HttpTransport + 'static>(
    registry: &ToolRegistry,
    tools: &Arc<WeatherTools<T>>,
) {
    for (tool, executor) in [
        current_weather_tool(Arc::clone(tools)),
        forecast_tool(Arc::clone(tools)),
        alerts_tool(Arc::clone(tools)),
        search_locations_tool(Arc::clone(tools)),
        time_zone_tool(Arc::clone(tools)),
    ] {
        registry.register(tool, executor);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)] // Test code can use expect
mod tests {
    use super::*;
    use crate::format::DAYS_OUT_OF_RANGE;
    use crate::mock::{MockResponse, MockTransport, RecordingProgress};
    use std::time::Duration;

    const BASE: &str = "http://weather.test/v1";

    fn paris_payload() -> Value {
        json!({
            "location": {
                "name": "Paris",
                "region": "Ile-de-France",
                "country": "France",
                "localtime": "2024-01-01 10:00"
            },
            "current": {
                "temp_c": 5,
                "temp_f": 41,
                "condition": {"text": "Cloudy"},
                "feelslike_c": 3,
                "wind_kph": 10,
                "wind_dir": "N",
                "humidity": 80,
                "cloud": 90,
                "precip_mm": 0,
                "uv": 1
            }
        })
    }

    fn weather(transport: &Arc<MockTransport>) -> Arc<WeatherTools<Arc<MockTransport>>> {
        let request = RequestConfig::default().with_backoff_base(Duration::from_millis(1));
        let client = ResilientClient::new(Arc::clone(transport), request);
        Arc::new(WeatherTools::new(
            client,
            WeatherConfig::new("test-key").with_base_url(BASE),
        ))
    }

    fn param<'a>(request: &'a ApiRequest, name: &str) -> Option<&'a str> {
        request
            .params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    #[tokio::test]
    async fn test_current_weather_paris() {
        let transport = Arc::new(MockTransport::always(MockResponse::json(200, paris_payload())));
        let progress = RecordingProgress::new();

        let text = weather(&transport).current_weather("Paris", Some(&progress)).await;

        for expected in ["Paris", "Ile-de-France", "France", "5", "Cloudy"] {
            assert!(text.contains(expected), "missing {expected} in {text}");
        }

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, format!("{BASE}/current.json"));
        assert_eq!(param(&requests[0], "q"), Some("Paris"));
        assert_eq!(param(&requests[0], "key"), Some("test-key"));

        let messages = progress.messages();
        assert_eq!(messages.first().map(String::as_str), Some("Requesting current weather for: Paris"));
        assert_eq!(messages.last().map(String::as_str), Some("Completed"));
    }

    #[tokio::test]
    async fn test_current_weather_backend_failure() {
        let transport = Arc::new(MockTransport::always(MockResponse::status(400, "No matching location")));

        let text = weather(&transport).current_weather("Nowhere", None).await;

        assert_eq!(
            text,
            "Could not retrieve weather for 'Nowhere'. Please check the location and try again."
        );
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_current_weather_incomplete_payload() {
        let transport = Arc::new(MockTransport::always(MockResponse::json(200, json!({"location": {}}))));

        let text = weather(&transport).current_weather("Paris", None).await;
        assert!(text.starts_with("Could not retrieve weather for 'Paris'"));
    }

    #[tokio::test]
    async fn test_forecast_out_of_range_skips_network() {
        let transport = Arc::new(MockTransport::always(MockResponse::json(200, json!({}))));
        let tools = weather(&transport);

        assert_eq!(tools.forecast("Paris", 0, None).await, DAYS_OUT_OF_RANGE);
        assert_eq!(tools.forecast("Paris", 8, None).await, DAYS_OUT_OF_RANGE);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_forecast_request_parameters() {
        let payload = json!({
            "location": {"name": "Paris", "region": "Ile-de-France", "country": "France"},
            "forecast": {"forecastday": [{"date": "2024-01-01", "day": {"avgtemp_c": 4}}]}
        });
        let transport = Arc::new(MockTransport::always(MockResponse::json(200, payload)));

        let text = weather(&transport).forecast("Paris", 3, None).await;

        assert!(text.starts_with("Forecast for Paris, Ile-de-France, France"));
        assert!(text.contains("Date: 2024-01-01"));

        let requests = transport.requests();
        let request = &requests[0];
        assert_eq!(request.url, format!("{BASE}/forecast.json"));
        assert_eq!(param(request, "days"), Some("3"));
        assert_eq!(param(request, "aqi"), Some("no"));
        assert_eq!(param(request, "alerts"), Some("no"));
    }

    #[tokio::test]
    async fn test_forecast_missing_days_block() {
        let transport = Arc::new(MockTransport::always(MockResponse::json(200, json!({"location": {}}))));

        let text = weather(&transport).forecast("Atlantis", 2, None).await;
        assert_eq!(text, "Could not retrieve forecast for 'Atlantis'.");
    }

    #[tokio::test]
    async fn test_alerts() {
        let payload = json!({"alerts": {"alert": [{"event": "Heat Advisory", "severity": "Moderate"}]}});
        let transport = Arc::new(MockTransport::always(MockResponse::json(200, payload)));

        let text = weather(&transport).alerts("Phoenix", None).await;

        assert!(text.starts_with("Weather Alerts for Phoenix:"));
        assert!(text.contains("- Event: Heat Advisory"));
        let requests = transport.requests();
        let request = &requests[0];
        assert_eq!(param(request, "alerts"), Some("yes"));
        assert_eq!(param(request, "days"), Some("1"));
    }

    #[tokio::test]
    async fn test_alerts_backend_failure() {
        let transport = Arc::new(MockTransport::always(MockResponse::status(500, "down")));

        let text = weather(&transport).alerts("Phoenix", None).await;
        assert_eq!(text, "Could not retrieve weather alerts for 'Phoenix'.");
    }

    #[tokio::test]
    async fn test_search_is_a_slow_endpoint() {
        let transport = Arc::new(MockTransport::always(MockResponse::status(503, "busy")));

        let text = weather(&transport).search_locations("lond", None).await;

        assert_eq!(text, "Could not search locations matching 'lond'.");
        assert_eq!(transport.call_count(), 4);
    }

    #[tokio::test]
    async fn test_time_zone() {
        let payload = json!({"location": {"name": "Tokyo", "tz_id": "Asia/Tokyo"}});
        let transport = Arc::new(MockTransport::always(MockResponse::json(200, payload)));

        let text = weather(&transport).time_zone("Tokyo", None).await;

        assert!(text.contains("Timezone: Asia/Tokyo"));
        assert_eq!(transport.requests()[0].url, format!("{BASE}/timezone.json"));
    }

    #[test]
    fn test_tool_schemas() {
        let transport = Arc::new(MockTransport::always(MockResponse::json(200, json!({}))));
        let tools = weather(&transport);

        let (current, _) = current_weather_tool(Arc::clone(&tools));
        let (forecast, _) = forecast_tool(Arc::clone(&tools));
        let (alerts, _) = alerts_tool(tools);

        assert_eq!(current.name, "get_current_weather");
        assert_eq!(forecast.input_schema["properties"]["days"]["default"], 3);
        assert_eq!(alerts.input_schema["required"], json!(["area"]));
    }

    #[tokio::test]
    async fn test_executor_accepts_q_alias_and_reports_progress() {
        let transport = Arc::new(MockTransport::always(MockResponse::json(200, paris_payload())));
        let (_tool, executor) = current_weather_tool(weather(&transport));
        let progress = Arc::new(RecordingProgress::new());

        let result = executor(
            json!({"q": "Paris"}).to_string(),
            Some(Arc::clone(&progress) as Arc<dyn ProgressReporter>),
        )
        .await;

        assert!(result.expect("should succeed").contains("Cloudy"));
        assert!(progress
            .messages()
            .iter()
            .any(|m| m.starts_with("Connecting to")));
    }

    #[tokio::test]
    async fn test_executor_forecast_defaults_to_three_days() {
        let payload = json!({"forecast": {"forecastday": []}});
        let transport = Arc::new(MockTransport::always(MockResponse::json(200, payload)));
        let (_tool, executor) = forecast_tool(weather(&transport));

        let result = executor(json!({"location": "Paris"}).to_string(), None).await;

        assert!(result.is_ok());
        assert_eq!(param(&transport.requests()[0], "days"), Some("3"));
    }

    #[tokio::test]
    async fn test_executor_rejects_malformed_arguments() {
        let transport = Arc::new(MockTransport::always(MockResponse::json(200, json!({}))));
        let (_tool, executor) = alerts_tool(weather(&transport));

        let result = executor(json!({"location": "Paris"}).to_string(), None).await;

        assert!(result
            .expect_err("should fail")
            .message
            .contains("Invalid input JSON"));
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn test_register_weather_tools() {
        let transport = Arc::new(MockTransport::always(MockResponse::json(200, json!({}))));
        let registry = ToolRegistry::new();

        register_weather_tools(&registry, &weather(&transport));

        assert_eq!(
            registry.list_tools(),
            vec![
                "get_current_weather",
                "get_time_zone",
                "get_weather_alerts",
                "get_weather_forecast",
                "search_locations"
            ]
        );
    }
}
