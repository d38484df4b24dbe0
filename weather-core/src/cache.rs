use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{WeatherPayload, clock::Clock};

/// Default lifetime of a cached weather payload.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Exact coordinate pair, compared bit-for-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey(u64, u64);

impl CacheKey {
    fn new(lat: f64, lon: f64) -> Self {
        Self(lat.to_bits(), lon.to_bits())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    inserted_at: DateTime<Utc>,
    payload: WeatherPayload,
}

/// Time-bounded weather cache keyed by coordinates.
///
/// Entries expire at `inserted_at + ttl`. Expired entries are removed lazily
/// the next time their key is looked up; there is no background sweep.
#[derive(Debug)]
pub struct WeatherCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl WeatherCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, lat: f64, lon: f64) -> Option<WeatherPayload> {
        let key = CacheKey::new(lat, lon);
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let entry = entries.get(&key)?;
        if self.is_fresh(entry, now) {
            return Some(entry.payload.clone());
        }

        entries.remove(&key);
        None
    }

    pub fn put(&self, lat: f64, lon: f64, payload: WeatherPayload) {
        let entry = CacheEntry {
            inserted_at: self.clock.now(),
            payload,
        };
        self.entries.lock().insert(CacheKey::new(lat, lon), entry);
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        // A clock that moved backwards yields a negative age; keep the entry.
        match (now - entry.inserted_at).to_std() {
            Ok(age) => age < self.ttl,
            Err(_) => true,
        }
    }
}
