//! Core library for the `weather` tool.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Abstraction over weather providers (geocoding + forecast)
//! - The weather cache and the date-range rules
//! - The file-backed record store and the record service on top of it
//! - JSON / CSV / PDF exports of the record collection
//!
//! It is used by `weather-app`, but can also be reused by other binaries or services.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod geocode;
pub mod icon;
pub mod model;
pub mod provider;
pub mod resolver;
pub mod service;
pub mod store;
pub mod validate;

pub use clock::{Clock, SystemClock};
pub use config::{Config, ProviderConfig};
pub use error::{Error, Result};
pub use model::{GeoLocation, NewRecord, Record, RecordPatch, WeatherPayload};
pub use provider::{ProviderId, WeatherProvider};
pub use service::RecordService;
pub use store::RecordStore;
pub use validate::DateRangeError;
