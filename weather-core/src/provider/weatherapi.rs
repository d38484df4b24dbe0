use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    Error, GeoLocation, WeatherPayload,
    icon::normalize_icon,
    model::{Condition, CurrentWeather, DailyForecast, MAX_FORECAST_DAYS, TempRange},
    provider::truncate_body,
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "http://api.weatherapi.com/v1";

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the provider at a different API root (e.g. a local mock server).
    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> anyhow::Result<T> {
        let url = format!("{}/{endpoint}", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            // The URL carries the API key; keep it out of messages.
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("Failed to send request to WeatherAPI.com ({endpoint})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("Failed to read WeatherAPI {endpoint} response body"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "WeatherAPI {} request failed with status {}: {}",
                endpoint,
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body).with_context(|| format!("Failed to parse WeatherAPI {endpoint} JSON"))
    }
}

#[derive(Debug, Deserialize)]
struct WaSearchResult {
    name: String,
    #[serde(default)]
    country: String,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
    #[serde(default)]
    icon: String,
}

impl From<WaCondition> for Condition {
    fn from(c: WaCondition) -> Self {
        Condition {
            main: c.text.clone(),
            description: c.text,
            icon: normalize_icon(&c.icon),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    feelslike_c: f64,
    humidity: u8,
    wind_kph: f64,
    pressure_mb: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaDay {
    maxtemp_c: f64,
    mintemp_c: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    date: NaiveDate,
    day: WaDay,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    current: WaCurrent,
    forecast: WaForecast,
}

impl From<WaForecastResponse> for WeatherPayload {
    fn from(parsed: WaForecastResponse) -> Self {
        let current = parsed.current;
        let current = CurrentWeather {
            temp: current.temp_c,
            feels_like: current.feelslike_c,
            humidity: current.humidity,
            wind_speed: kph_to_mps(current.wind_kph),
            pressure: current.pressure_mb,
            weather: vec![current.condition.into()],
        };

        let daily = parsed
            .forecast
            .forecastday
            .into_iter()
            .take(MAX_FORECAST_DAYS)
            .map(|d| DailyForecast {
                dt: midnight_utc(d.date),
                temp: TempRange {
                    min: d.day.mintemp_c,
                    max: d.day.maxtemp_c,
                },
                weather: vec![d.day.condition.into()],
            })
            .collect();

        WeatherPayload { current, daily }
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn geocode(&self, query: &str) -> crate::Result<GeoLocation> {
        debug!(query, "WeatherAPI search");
        let hits: Vec<WaSearchResult> = self.get_json("search.json", &[("q", query)]).await?;

        let hit = hits
            .into_iter()
            .next()
            .ok_or_else(|| Error::LocationNotFound(query.to_string()))?;

        Ok(GeoLocation {
            lat: hit.lat,
            lon: hit.lon,
            city: hit.name,
            country: hit.country,
        })
    }

    async fn forecast(&self, lat: f64, lon: f64) -> crate::Result<WeatherPayload> {
        debug!(lat, lon, "WeatherAPI forecast");
        let q = format!("{lat},{lon}");
        let days = MAX_FORECAST_DAYS.to_string();
        let parsed: WaForecastResponse = self
            .get_json("forecast.json", &[("q", q.as_str()), ("days", days.as_str())])
            .await?;

        Ok(parsed.into())
    }
}

fn kph_to_mps(kph: f64) -> f64 {
    kph / 3.6
}

fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn forecast_body() -> serde_json::Value {
        let day = |date: &str, min: f64, max: f64| {
            serde_json::json!({
                "date": date,
                "date_epoch": 0,
                "day": {
                    "maxtemp_c": max,
                    "mintemp_c": min,
                    "condition": {
                        "text": "Patchy rain nearby",
                        "icon": "//cdn.weatherapi.com/weather/64x64/day/176.png",
                        "code": 1063
                    }
                }
            })
        };

        serde_json::json!({
            "location": { "name": "Paris", "country": "France" },
            "current": {
                "temp_c": 14.0,
                "feelslike_c": 12.5,
                "humidity": 72,
                "wind_kph": 18.0,
                "pressure_mb": 1015.0,
                "condition": {
                    "text": "Partly cloudy",
                    "icon": "//cdn.weatherapi.com/weather/64x64/day/116.png",
                    "code": 1003
                }
            },
            "forecast": {
                "forecastday": [
                    day("2026-10-16", 9.0, 15.0),
                    day("2026-10-17", 8.0, 14.0),
                    day("2026-10-18", 7.5, 13.0),
                    day("2026-10-19", 7.0, 12.0),
                    day("2026-10-20", 6.0, 11.0),
                    day("2026-10-21", 6.0, 11.0)
                ]
            }
        })
    }

    #[tokio::test]
    async fn geocode_takes_first_hit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("key", "KEY"))
            .and(query_param("q", "Paris"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": 1, "name": "Paris", "region": "Ile-de-France", "country": "France", "lat": 48.87, "lon": 2.33 },
                { "id": 2, "name": "Paris", "region": "Texas", "country": "United States of America", "lat": 33.66, "lon": -95.56 }
            ])))
            .mount(&server)
            .await;

        let provider = WeatherApiProvider::with_base_url("KEY".into(), server.uri());
        let loc = provider.geocode("Paris").await.unwrap();

        assert_eq!(loc.city, "Paris");
        assert_eq!(loc.country, "France");
        assert!((loc.lat - 48.87).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn geocode_empty_result_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let provider = WeatherApiProvider::with_base_url("KEY".into(), server.uri());
        let err = provider.geocode("Atlantis").await.unwrap_err();
        assert!(matches!(err, Error::LocationNotFound(q) if q == "Atlantis"));
    }

    #[tokio::test]
    async fn http_failure_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(401).set_body_string("API key is invalid."))
            .mount(&server)
            .await;

        let provider = WeatherApiProvider::with_base_url("BAD".into(), server.uri());
        let err = provider.geocode("Paris").await.unwrap_err();

        assert!(matches!(err, Error::Upstream(_)));
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("API key is invalid."));
    }

    #[tokio::test]
    async fn forecast_transforms_to_canonical_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast.json"))
            .and(query_param("q", "48.87,2.33"))
            .and(query_param("days", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .mount(&server)
            .await;

        let provider = WeatherApiProvider::with_base_url("KEY".into(), server.uri());
        let payload = provider.forecast(48.87, 2.33).await.unwrap();

        assert_eq!(payload.current.temp, 14.0);
        assert_eq!(payload.current.humidity, 72);
        assert!((payload.current.wind_speed - 5.0).abs() < 1e-9);
        assert_eq!(payload.current.pressure, 1015.0);
        assert_eq!(payload.current.weather[0].icon, "116");
        assert_eq!(payload.current.weather[0].main, "Partly cloudy");

        assert_eq!(payload.daily.len(), 5);
        let first = &payload.daily[0];
        assert_eq!(first.dt, 1_792_108_800);
        assert_eq!(first.temp.min, 9.0);
        assert_eq!(first.temp.max, 15.0);
        assert_eq!(first.weather[0].icon, "176");
    }

    #[tokio::test]
    async fn malformed_forecast_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "unexpected": true })))
            .mount(&server)
            .await;

        let provider = WeatherApiProvider::with_base_url("KEY".into(), server.uri());
        let err = provider.forecast(1.0, 2.0).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        assert!(err.to_string().contains("Failed to parse WeatherAPI forecast.json JSON"));
    }

    #[tokio::test]
    async fn connection_errors_do_not_expose_the_key() {
        // Nothing listens on port 1.
        let provider = WeatherApiProvider::with_base_url("SECRETKEY123".into(), "http://127.0.0.1:1");

        let err = provider.geocode("Paris").await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        let msg = err.to_string();
        assert!(msg.contains("Failed to send request to WeatherAPI.com"));
        assert!(!msg.contains("SECRETKEY123"));
        assert!(!format!("{err:?}").contains("SECRETKEY123"));

        let err = provider.forecast(48.8, 2.3).await.unwrap_err();
        assert!(!err.to_string().contains("SECRETKEY123"));
    }
}
