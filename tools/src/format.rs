//! Weather report formatters
//!
//! Pure, total functions from loosely typed JSON payloads to text reports.
//! Every field lookup tolerates absence: missing values render as a
//! placeholder instead of failing. Nothing here performs I/O.

use serde_json::Value;
use std::fmt;
use std::ops::RangeInclusive;

/// Placeholder for missing weather fields
pub const PLACEHOLDER: &str = "N/A";

/// Allowed forecast lengths in days
pub const FORECAST_DAYS: RangeInclusive<i64> = 1..=7;

/// Message returned for a forecast length outside [`FORECAST_DAYS`]
pub const DAYS_OUT_OF_RANGE: &str = "Days parameter must be between 1 and 7.";

static NULL: Value = Value::Null;

/// Ordered lines of a rendered report, immutable once built
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattedReport {
    lines: Vec<String>,
}

impl FormattedReport {
    /// Report lines
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines joined with `\n`
    #[must_use]
    pub fn into_text(self) -> String {
        self.lines.join("\n")
    }
}

impl From<Vec<String>> for FormattedReport {
    fn from(lines: Vec<String>) -> Self {
        Self { lines }
    }
}

impl fmt::Display for FormattedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}

/// Check a requested forecast length
///
/// # Errors
///
/// Returns [`DAYS_OUT_OF_RANGE`] if `days` is outside 1–7
pub fn validate_days(days: i64) -> Result<u8, &'static str> {
    if FORECAST_DAYS.contains(&days) {
        u8::try_from(days).map_err(|_| DAYS_OUT_OF_RANGE)
    } else {
        Err(DAYS_OUT_OF_RANGE)
    }
}

/// Current conditions: one labelled line per field
#[must_use]
pub fn format_current_conditions(payload: &Value) -> FormattedReport {
    let loc = field(payload, &["location"]);
    let cur = field(payload, &["current"]);

    vec![
        format!("Weather for {}", place(loc)),
        format!("Time: {}", text(loc, &["localtime"])),
        format!(
            "Temperature: {}°C / {}°F",
            text(cur, &["temp_c"]),
            text(cur, &["temp_f"])
        ),
        format!("Condition: {}", text(cur, &["condition", "text"])),
        format!(
            "Feels Like: {}°C / {}°F",
            text(cur, &["feelslike_c"]),
            text(cur, &["feelslike_f"])
        ),
        format!(
            "Wind: {} kph ({})",
            text(cur, &["wind_kph"]),
            text(cur, &["wind_dir"])
        ),
        format!("Humidity: {}%", text(cur, &["humidity"])),
        format!("Cloud Cover: {}%", text(cur, &["cloud"])),
        format!("Precipitation: {} mm", text(cur, &["precip_mm"])),
        format!("UV Index: {}", text(cur, &["uv"])),
    ]
    .into()
}

/// Multi-day forecast: location header, then one block per day
///
/// A `days` value outside 1–7 yields the single-line range message.
#[must_use]
pub fn format_forecast(payload: &Value, days: i64) -> FormattedReport {
    let Ok(days) = validate_days(days) else {
        return vec![DAYS_OUT_OF_RANGE.to_string()].into();
    };

    let mut lines = vec![
        format!("Forecast for {}", place(field(payload, &["location"]))),
        String::new(),
    ];

    for day in items(payload, &["forecast", "forecastday"]).take(usize::from(days)) {
        let info = field(day, &["day"]);
        lines.push(format!("Date: {}", text(day, &["date"])));
        lines.push(format!(
            "  - Avg Temp: {}°C / {}°F",
            text(info, &["avgtemp_c"]),
            text(info, &["avgtemp_f"])
        ));
        lines.push(format!(
            "  - Min/Max Temp: {}°C to {}°C / {}°F to {}°F",
            text(info, &["mintemp_c"]),
            text(info, &["maxtemp_c"]),
            text(info, &["mintemp_f"]),
            text(info, &["maxtemp_f"])
        ));
        lines.push(format!("  - Condition: {}", text(info, &["condition", "text"])));
        lines.push(format!("  - Max Wind: {} kph", text(info, &["maxwind_kph"])));
        lines.push(format!("  - Humidity: {}%", text(info, &["avghumidity"])));
        lines.push(format!(
            "  - Rain: {}% chance",
            text(info, &["daily_chance_of_rain"])
        ));
        lines.push(String::new());
    }

    lines.into()
}

/// Active alerts for `area`, or a single "no alerts" sentence
#[must_use]
pub fn format_alerts(area: &str, payload: &Value) -> FormattedReport {
    let alerts: Vec<&Value> = items(payload, &["alerts", "alert"]).collect();
    if alerts.is_empty() {
        return vec![format!("No weather alerts for '{area}'.")].into();
    }

    let mut lines = vec![format!("Weather Alerts for {area}:")];
    for alert in alerts {
        lines.push(format!("- Event: {}", text_or(alert, &["event"], "Unknown")));
        lines.push(format!("  Severity: {}", text_or(alert, &["severity"], "Unknown")));
        lines.push(format!("  Areas: {}", text_or(alert, &["areas"], "Unknown")));
        lines.push(format!("  Effective: {}", text_or(alert, &["effective"], "Unknown")));
        lines.push(format!("  Expires: {}", text_or(alert, &["expires"], "Unknown")));
        lines.push(format!(
            "  Description: {}",
            text_or(alert, &["desc"], "No description")
        ));
        lines.push("---".to_string());
    }

    lines.into()
}

/// Location search results
#[must_use]
pub fn format_locations(query: &str, payload: &Value) -> FormattedReport {
    let Some(found) = payload.as_array() else {
        return vec![format!("Invalid response format for location search '{query}'.")].into();
    };
    if found.is_empty() {
        return vec![format!("No locations found matching '{query}'.")].into();
    }

    let mut lines = vec![
        format!("Found {} locations matching '{query}':", found.len()),
        String::new(),
    ];
    for location in found {
        lines.push(place(location));
        lines.push(format!(
            "Coordinates: {}, {}",
            text(location, &["lat"]),
            text(location, &["lon"])
        ));
        lines.push(format!("ID: {}", text(location, &["id"])));
        lines.push(String::new());
    }

    lines.into()
}

/// Time zone details for a location
#[must_use]
pub fn format_time_zone(payload: &Value) -> FormattedReport {
    let loc = field(payload, &["location"]);

    vec![
        format!("Timezone Information for {}:", place(loc)),
        format!("Timezone: {}", text(loc, &["tz_id"])),
        format!("Local Time: {}", text(loc, &["localtime"])),
        format!("Latitude: {}", text(loc, &["lat"])),
        format!("Longitude: {}", text(loc, &["lon"])),
    ]
    .into()
}

/// Nested lookup; `Value::Null` when any segment is missing
fn field<'a>(value: &'a Value, path: &[&str]) -> &'a Value {
    path.iter()
        .try_fold(value, |current, key| current.get(key))
        .unwrap_or(&NULL)
}

fn items<'a>(value: &'a Value, path: &[&str]) -> impl Iterator<Item = &'a Value> {
    field(value, path).as_array().into_iter().flatten()
}

fn text(value: &Value, path: &[&str]) -> String {
    text_or(value, path, PLACEHOLDER)
}

fn text_or(value: &Value, path: &[&str], default: &str) -> String {
    match field(value, path) {
        Value::Null => default.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn place(location: &Value) -> String {
    format!(
        "{}, {}, {}",
        text(location, &["name"]),
        text(location, &["region"]),
        text(location, &["country"])
    )
}
