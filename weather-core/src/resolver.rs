use std::sync::Arc;

use tracing::debug;

use crate::{Result, WeatherPayload, cache::WeatherCache, model::MAX_FORECAST_DAYS, provider::WeatherProvider};

/// Fetches weather for coordinates, consulting the cache first.
#[derive(Debug, Clone)]
pub struct WeatherResolver {
    provider: Arc<dyn WeatherProvider>,
    cache: Arc<WeatherCache>,
}

impl WeatherResolver {
    pub fn new(provider: Arc<dyn WeatherProvider>, cache: Arc<WeatherCache>) -> Self {
        Self { provider, cache }
    }

    /// Cached payload if still fresh, otherwise a provider fetch that is then
    /// cached. Provider failures are returned as-is, without retry.
    pub async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherPayload> {
        if let Some(payload) = self.cache.get(lat, lon) {
            debug!(lat, lon, "Weather cache hit");
            return Ok(payload);
        }

        debug!(lat, lon, "Weather cache miss");
        let mut payload = self.provider.forecast(lat, lon).await?;
        payload.daily.truncate(MAX_FORECAST_DAYS);

        self.cache.put(lat, lon, payload.clone());
        Ok(payload)
    }
}
