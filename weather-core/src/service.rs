use std::{sync::Arc, time::Duration};

use tracing::info;
use uuid::Uuid;

use crate::{
    Error, GeoLocation, Record, Result, WeatherPayload,
    cache::WeatherCache,
    clock::Clock,
    geocode::Geocoder,
    model::{DailyForecast, DateRange, DateRangeInput, MAX_FORECAST_DAYS, NewRecord, RecordPatch},
    provider::WeatherProvider,
    resolver::WeatherResolver,
    store::RecordStore,
    validate::{parse_date, validate_date_range},
};

/// Record lifecycle: geocode, fetch weather, validate dates, persist.
#[derive(Debug)]
pub struct RecordService {
    geocoder: Geocoder,
    resolver: WeatherResolver,
    store: RecordStore,
    clock: Arc<dyn Clock>,
}

impl RecordService {
    pub fn new(
        geocoder: Geocoder,
        resolver: WeatherResolver,
        store: RecordStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            geocoder,
            resolver,
            store,
            clock,
        }
    }

    /// Wire a geocoder and a cached resolver around a single provider.
    pub fn with_provider(
        provider: Arc<dyn WeatherProvider>,
        store: RecordStore,
        cache_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Arc::new(WeatherCache::new(cache_ttl, clock.clone()));
        Self::new(
            Geocoder::new(provider.clone()),
            WeatherResolver::new(provider, cache),
            store,
            clock,
        )
    }

    pub async fn geocode(&self, query: &str) -> Result<GeoLocation> {
        self.geocoder.resolve(query).await
    }

    pub async fn weather(&self, lat: f64, lon: f64) -> Result<WeatherPayload> {
        self.resolver.fetch(lat, lon).await
    }

    /// Resolve, snapshot and save a new lookup. Missing date bounds default to today.
    pub async fn create(&self, request: NewRecord) -> Result<Record> {
        if request.location_input.trim().is_empty() {
            return Err(Error::validation("locationInput required"));
        }

        let today = self.clock.today();
        let date_range = self.effective_range(
            request.date_range.as_ref(),
            DateRange {
                start: today,
                end: today,
            },
        )?;

        let location = self.geocoder.resolve(&request.location_input).await?;
        let weather = self.resolver.fetch(location.lat, location.lon).await?;

        let now = self.clock.now();
        let record = Record {
            id: Uuid::new_v4().to_string(),
            location_input: request.location_input,
            resolved_city: location.city,
            country: location.country,
            lat: location.lat,
            lon: location.lon,
            date_range,
            current_weather: Some(weather.current),
            forecast: truncate_forecast(weather.daily),
            created_at: now,
            updated_at: now,
        };

        self.store.insert(record.clone()).await?;
        info!(id = %record.id, city = %record.resolved_city, "Created record");

        Ok(record)
    }

    /// Apply a patch and refresh the weather snapshot.
    ///
    /// A changed `locationInput` is geocoded again; the weather is always
    /// fetched for the resulting coordinates.
    pub async fn update(&self, id: &str, patch: RecordPatch) -> Result<Record> {
        let existing = self.store.get(id).await?;

        let new_input = patch
            .location_input
            .as_deref()
            .map(str::trim)
            .filter(|input| !input.is_empty());

        let location = match new_input {
            Some(input) if input != existing.location_input => self.geocoder.resolve(input).await?,
            _ => GeoLocation {
                lat: existing.lat,
                lon: existing.lon,
                city: existing.resolved_city.clone(),
                country: existing.country.clone(),
            },
        };

        let date_range = self.effective_range(patch.date_range.as_ref(), existing.date_range)?;
        let weather = self.resolver.fetch(location.lat, location.lon).await?;

        let updated = Record {
            location_input: new_input
                .map(str::to_owned)
                .unwrap_or(existing.location_input),
            resolved_city: location.city,
            country: location.country,
            lat: location.lat,
            lon: location.lon,
            date_range,
            current_weather: Some(weather.current),
            forecast: truncate_forecast(weather.daily),
            updated_at: self.clock.now(),
            ..existing
        };

        let updated = self.store.update(id, updated).await?;
        info!(id, city = %updated.resolved_city, "Updated record");

        Ok(updated)
    }

    pub async fn get(&self, id: &str) -> Result<Record> {
        self.store.get(id).await
    }

    pub async fn list(&self, filter: Option<&str>) -> Result<Vec<Record>> {
        self.store.list(filter).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(id).await?;
        info!(id, "Deleted record");
        Ok(())
    }

    /// Fill missing bounds from `fallback`, then validate the pair.
    fn effective_range(
        &self,
        input: Option<&DateRangeInput>,
        fallback: DateRange,
    ) -> Result<DateRange> {
        let start = input
            .and_then(DateRangeInput::start)
            .map(str::to_owned)
            .unwrap_or_else(|| fallback.start.to_string());
        let end = input
            .and_then(DateRangeInput::end)
            .map(str::to_owned)
            .unwrap_or_else(|| fallback.end.to_string());

        validate_date_range(Some(&start), Some(&end), self.clock.today())?;

        Ok(DateRange {
            start: parse_date(&start)?,
            end: parse_date(&end)?,
        })
    }
}

fn truncate_forecast(mut daily: Vec<DailyForecast>) -> Vec<DailyForecast> {
    daily.truncate(MAX_FORECAST_DAYS);
    daily
}
