//! Application state shared across handlers.

use std::sync::Arc;

use weather_core::RecordService;

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Record lifecycle plus the geocode/weather lookups behind it.
    pub service: RecordService,
}

impl AppState {
    pub fn new(service: RecordService) -> Arc<Self> {
        Arc::new(Self { service })
    }
}
