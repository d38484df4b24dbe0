//! In-process provider for tests. Built with `cfg(test)` or the `test-util` feature.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;

use crate::{
    Error, GeoLocation, WeatherPayload,
    model::{Condition, CurrentWeather, DailyForecast, MAX_FORECAST_DAYS, TempRange},
};

use super::WeatherProvider;

/// A provider backed by a fixed location table.
///
/// Every successful `forecast` call returns a payload whose current
/// temperature is one degree higher than the previous call, so callers can
/// tell a fresh fetch from a cached one.
#[derive(Debug, Default)]
pub struct MockProvider {
    locations: HashMap<String, GeoLocation>,
    geocode_calls: AtomicUsize,
    forecast_calls: AtomicUsize,
    fail_upstream: AtomicBool,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a location under a case-insensitive query.
    pub fn with_location(mut self, query: &str, location: GeoLocation) -> Self {
        self.locations.insert(query.trim().to_lowercase(), location);
        self
    }

    /// Make every subsequent call fail as if the provider were down.
    pub fn set_failing(&self, failing: bool) {
        self.fail_upstream.store(failing, Ordering::SeqCst);
    }

    pub fn geocode_calls(&self) -> usize {
        self.geocode_calls.load(Ordering::SeqCst)
    }

    pub fn forecast_calls(&self) -> usize {
        self.forecast_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> crate::Result<()> {
        if self.fail_upstream.load(Ordering::SeqCst) {
            return Err(Error::Upstream(anyhow!("mock provider is unavailable")));
        }
        Ok(())
    }
}

/// Deterministic payload for the given call number.
pub fn sample_payload(call: usize) -> WeatherPayload {
    let condition = Condition {
        main: "Partly cloudy".to_string(),
        description: "Partly cloudy".to_string(),
        icon: "116".to_string(),
    };
    let base = 10.0 + call as f64;

    WeatherPayload {
        current: CurrentWeather {
            temp: base,
            feels_like: base - 1.5,
            humidity: 65,
            wind_speed: 3.5,
            pressure: 1013.0,
            weather: vec![condition.clone()],
        },
        daily: (0..MAX_FORECAST_DAYS as i64)
            .map(|day| DailyForecast {
                dt: 1_792_108_800 + day * 86_400,
                temp: TempRange {
                    min: base - 4.0,
                    max: base + 4.0,
                },
                weather: vec![condition.clone()],
            })
            .collect(),
    }
}

#[async_trait]
impl WeatherProvider for MockProvider {
    async fn geocode(&self, query: &str) -> crate::Result<GeoLocation> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        self.locations
            .get(&query.trim().to_lowercase())
            .cloned()
            .ok_or_else(|| Error::LocationNotFound(query.to_string()))
    }

    async fn forecast(&self, _lat: f64, _lon: f64) -> crate::Result<WeatherPayload> {
        self.check_available()?;
        let call = self.forecast_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(sample_payload(call))
    }
}
