use std::sync::Arc;

use tracing::{debug, info};

use crate::{Error, GeoLocation, Result, provider::WeatherProvider};

/// Resolves free-text location queries through the configured provider.
///
/// Results are not cached: every call reaches the provider.
#[derive(Debug, Clone)]
pub struct Geocoder {
    provider: Arc<dyn WeatherProvider>,
}

impl Geocoder {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    pub async fn resolve(&self, query: &str) -> Result<GeoLocation> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::validation("Location query must not be empty"));
        }

        debug!(query, "Geocoding");
        let location = self.provider.geocode(query).await?;
        info!(
            query,
            city = %location.city,
            country = %location.country,
            lat = location.lat,
            lon = location.lon,
            "Resolved location"
        );

        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;

    fn geocoder() -> (Arc<MockProvider>, Geocoder) {
        let provider = Arc::new(MockProvider::new().with_location(
            "Paris",
            GeoLocation {
                lat: 48.8,
                lon: 2.3,
                city: "Paris".into(),
                country: "FR".into(),
            },
        ));
        (provider.clone(), Geocoder::new(provider))
    }

    #[tokio::test]
    async fn resolves_known_location() {
        let (_, geocoder) = geocoder();
        let loc = geocoder.resolve("Paris").await.unwrap();
        assert_eq!(loc.country, "FR");
    }

    #[tokio::test]
    async fn empty_query_never_reaches_provider() {
        let (provider, geocoder) = geocoder();
        let err = geocoder.resolve("   ").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(provider.geocode_calls(), 0);
    }

    #[tokio::test]
    async fn every_call_hits_the_provider() {
        let (provider, geocoder) = geocoder();
        geocoder.resolve("Paris").await.unwrap();
        geocoder.resolve("Paris").await.unwrap();
        assert_eq!(provider.geocode_calls(), 2);
    }

    #[tokio::test]
    async fn unknown_location_is_not_found() {
        let (_, geocoder) = geocoder();
        let err = geocoder.resolve("Atlantis").await.unwrap_err();
        assert!(matches!(err, Error::LocationNotFound(_)));
    }
}
