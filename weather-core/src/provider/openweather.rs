use std::collections::BTreeMap;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Timelike};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    Error, GeoLocation, WeatherPayload,
    icon::normalize_icon,
    model::{Condition, CurrentWeather, DailyForecast, MAX_FORECAST_DAYS, TempRange},
    provider::truncate_body,
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

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
        what: &str,
        query: &[(&str, &str)],
    ) -> anyhow::Result<T> {
        let (status, body) = self.get(endpoint, what, query).await?;
        parse_body(what, status, &body)
    }

    async fn get(
        &self,
        endpoint: &str,
        what: &str,
        query: &[(&str, &str)],
    ) -> anyhow::Result<(StatusCode, String)> {
        let url = format!("{}/{endpoint}", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            // The URL carries the API key; keep it out of messages.
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("Failed to send request to OpenWeather ({what})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("Failed to read OpenWeather {what} response body"))?;

        Ok((status, body))
    }

    async fn geocode_direct(&self, query: &str) -> crate::Result<GeoLocation> {
        debug!(query, "OpenWeather direct geocoding");
        let hits: Vec<OwGeoHit> = self
            .get_json("geo/1.0/direct", "geocoding", &[("q", query), ("limit", "1")])
            .await?;

        hits.into_iter()
            .next()
            .map(GeoLocation::from)
            .ok_or_else(|| Error::LocationNotFound(query.to_string()))
    }

    /// Coordinates are kept as given; the lookup only names the place.
    async fn geocode_reverse(&self, query: &str, lat: f64, lon: f64) -> crate::Result<GeoLocation> {
        debug!(lat, lon, "OpenWeather reverse geocoding");
        let (lat_s, lon_s) = (lat.to_string(), lon.to_string());
        let hits: Vec<OwGeoHit> = self
            .get_json(
                "geo/1.0/reverse",
                "reverse geocoding",
                &[("lat", lat_s.as_str()), ("lon", lon_s.as_str()), ("limit", "1")],
            )
            .await?;

        let (city, country) = match hits.into_iter().next() {
            Some(hit) => (hit.name, hit.country),
            // Open sea and other unnamed places.
            None => (query.to_string(), String::new()),
        };

        Ok(GeoLocation {
            lat,
            lon,
            city,
            country,
        })
    }

    async fn geocode_zip(&self, query: &str) -> crate::Result<GeoLocation> {
        debug!(query, "OpenWeather zip geocoding");
        let (status, body) = self.get("geo/1.0/zip", "zip geocoding", &[("zip", query)]).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(Error::LocationNotFound(query.to_string()));
        }

        let hit: OwGeoHit = parse_body("zip geocoding", status, &body)?;
        Ok(hit.into())
    }
}

fn parse_body<T: DeserializeOwned>(what: &str, status: StatusCode, body: &str) -> anyhow::Result<T> {
    if !status.is_success() {
        return Err(anyhow!(
            "OpenWeather {} request failed with status {}: {}",
            what,
            status,
            truncate_body(body),
        ));
    }

    serde_json::from_str(body).with_context(|| format!("Failed to parse OpenWeather {what} JSON"))
}

/// `"<lat>,<lon>"` with both parts finite and in range.
fn parse_coordinates(query: &str) -> Option<(f64, f64)> {
    let (lat, lon) = query.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;

    let valid = lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon);
    valid.then_some((lat, lon))
}

/// A postal code, optionally followed by a two-letter country code:
/// `75001`, `10001,US`, `SW1A 1AA,GB`.
fn is_postal_code(query: &str) -> bool {
    let (code, country) = match query.split_once(',') {
        Some((code, country)) => (code.trim(), Some(country.trim())),
        None => (query.trim(), None),
    };

    let code_ok = (3..=10).contains(&code.len())
        && code.chars().any(|c| c.is_ascii_digit())
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-');
    let country_ok =
        country.is_none_or(|cc| cc.len() == 2 && cc.chars().all(|c| c.is_ascii_alphabetic()));

    code_ok && country_ok
}

#[derive(Debug, Deserialize)]
struct OwGeoHit {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    country: String,
}

impl From<OwGeoHit> for GeoLocation {
    fn from(hit: OwGeoHit) -> Self {
        GeoLocation {
            lat: hit.lat,
            lon: hit.lon,
            city: hit.name,
            country: hit.country,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: u8,
    pressure: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
    icon: String,
}

impl From<OwWeather> for Condition {
    fn from(w: OwWeather) -> Self {
        Condition {
            main: w.main,
            description: w.description,
            icon: normalize_icon(&w.icon),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    /// Offset from UTC in seconds.
    #[serde(default)]
    timezone: i64,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

struct DayAccumulator {
    min: f64,
    max: f64,
    /// Representative conditions: the slot closest to local noon.
    noon_distance: i64,
    weather: Vec<OwWeather>,
}

/// Fold 3-hourly forecast slots into calendar days in the city's timezone.
fn daily_from_slots(slots: Vec<OwForecastEntry>, utc_offset_secs: i64) -> Vec<DailyForecast> {
    let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

    for slot in slots {
        let Some(local) = DateTime::from_timestamp(slot.dt + utc_offset_secs, 0) else {
            continue;
        };
        let noon_distance = (i64::from(local.hour()) - 12).abs();

        days.entry(local.date_naive())
            .and_modify(|acc| {
                acc.min = acc.min.min(slot.main.temp_min);
                acc.max = acc.max.max(slot.main.temp_max);
                if noon_distance < acc.noon_distance {
                    acc.noon_distance = noon_distance;
                    acc.weather = slot.weather.clone();
                }
            })
            .or_insert_with(|| DayAccumulator {
                min: slot.main.temp_min,
                max: slot.main.temp_max,
                noon_distance,
                weather: slot.weather.clone(),
            });
    }

    days.into_iter()
        .take(MAX_FORECAST_DAYS)
        .map(|(date, acc)| DailyForecast {
            dt: date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp())
                .unwrap_or_default(),
            temp: TempRange {
                min: acc.min,
                max: acc.max,
            },
            weather: acc.weather.into_iter().map(Condition::from).collect(),
        })
        .collect()
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    /// Coordinate pairs go to reverse geocoding, postal codes to the zip
    /// endpoint, everything else to direct (place name) geocoding.
    async fn geocode(&self, query: &str) -> crate::Result<GeoLocation> {
        let query = query.trim();
        if let Some((lat, lon)) = parse_coordinates(query) {
            self.geocode_reverse(query, lat, lon).await
        } else if is_postal_code(query) {
            self.geocode_zip(query).await
        } else {
            self.geocode_direct(query).await
        }
    }

    async fn forecast(&self, lat: f64, lon: f64) -> crate::Result<WeatherPayload> {
        debug!(lat, lon, "OpenWeather current + 5-day forecast");
        let lat = lat.to_string();
        let lon = lon.to_string();
        let query = [
            ("lat", lat.as_str()),
            ("lon", lon.as_str()),
            ("units", "metric"),
        ];

        let current: OwCurrentResponse = self
            .get_json("data/2.5/weather", "current weather", &query)
            .await?;
        let forecast: OwForecastResponse = self
            .get_json("data/2.5/forecast", "5-day forecast", &query)
            .await?;

        // Metric units already report wind in m/s.
        let current = CurrentWeather {
            temp: current.main.temp,
            feels_like: current.main.feels_like,
            humidity: current.main.humidity,
            wind_speed: current.wind.speed,
            pressure: current.main.pressure,
            weather: current.weather.into_iter().map(Condition::from).collect(),
        };

        Ok(WeatherPayload {
            current,
            daily: daily_from_slots(forecast.list, forecast.city.timezone),
        })
    }
}
