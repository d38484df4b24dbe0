use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of daily entries kept in a forecast.
pub const MAX_FORECAST_DAYS: usize = 5;

/// A geocoded location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lon: f64,
    pub city: String,
    pub country: String,
}

/// One weather condition as reported by the provider.
///
/// `icon` is a bare code (`"116"`, `"10d"`); see [`crate::icon::icon_url`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub main: String,
    pub description: String,
    pub icon: String,
}

/// Current conditions snapshot. Temperatures in °C, wind in m/s, pressure in hPa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub wind_speed: f64,
    pub pressure: f64,
    pub weather: Vec<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempRange {
    pub min: f64,
    pub max: f64,
}

/// One forecast day. `dt` is the UTC midnight of that day, in epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub dt: i64,
    pub temp: TempRange,
    pub weather: Vec<Condition>,
}

/// Canonical provider output, also the cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherPayload {
    pub current: CurrentWeather,
    pub daily: Vec<DailyForecast>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// A saved weather lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub location_input: String,
    pub resolved_city: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    pub date_range: DateRange,
    pub current_weather: Option<CurrentWeather>,
    pub forecast: Vec<DailyForecast>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Case-insensitive substring match on the input text, city and country.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        [&self.location_input, &self.resolved_city, &self.country]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Date range as supplied by a caller: raw `YYYY-MM-DD` strings, either side optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRangeInput {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

impl DateRangeInput {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }

    /// Start bound, with blank strings treated as absent.
    pub fn start(&self) -> Option<&str> {
        non_blank(self.start.as_deref())
    }

    pub fn end(&self) -> Option<&str> {
        non_blank(self.end.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Body of a create request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    #[serde(default)]
    pub location_input: String,
    #[serde(default)]
    pub date_range: Option<DateRangeInput>,
}

/// Body of an update request; absent fields keep their stored values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(default)]
    pub location_input: Option<String>,
    #[serde(default)]
    pub date_range: Option<DateRangeInput>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(input: &str, city: &str, country: &str) -> Record {
        let now = Utc::now();
        let today = now.date_naive();
        Record {
            id: "id".into(),
            location_input: input.into(),
            resolved_city: city.into(),
            country: country.into(),
            lat: 0.0,
            lon: 0.0,
            date_range: DateRange {
                start: today,
                end: today,
            },
            current_weather: None,
            forecast: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn matches_any_text_field() {
        let r = record("10115", "Berlin", "Germany");
        assert!(r.matches("101"));
        assert!(r.matches("berl"));
        assert!(r.matches("germ"));
        assert!(!r.matches("paris"));
    }

    #[test]
    fn record_uses_camel_case_on_the_wire() {
        let json = serde_json::to_value(record("Paris", "Paris", "France")).unwrap();
        assert!(json.get("locationInput").is_some());
        assert!(json.get("resolvedCity").is_some());
        assert!(json.get("dateRange").is_some());
        assert!(json["currentWeather"].is_null());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn blank_date_bounds_are_absent() {
        let input = DateRangeInput {
            start: Some("  ".into()),
            end: Some("2026-01-02".into()),
        };
        assert_eq!(input.start(), None);
        assert_eq!(input.end(), Some("2026-01-02"));
    }

    #[test]
    fn new_record_tolerates_missing_fields() {
        let parsed: NewRecord = serde_json::from_str("{}").unwrap();
        assert!(parsed.location_input.is_empty());
        assert!(parsed.date_range.is_none());

        let parsed: NewRecord =
            serde_json::from_str(r#"{"locationInput":"Oslo","dateRange":{"start":"2026-01-01"}}"#)
                .unwrap();
        assert_eq!(parsed.location_input, "Oslo");
        assert_eq!(parsed.date_range.unwrap().end, None);
    }
}
