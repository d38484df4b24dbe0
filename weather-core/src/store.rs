//! File-backed record collection.
//!
//! The whole collection lives in one JSON file and every mutation rewrites it.
//! Before each write the previous file is copied to `<file>.bak`; a failed
//! backup is logged and does not block the write.
//!
//! Access is serialized within the process, so two concurrent updates never
//! interleave their read-modify-write cycles and readers never see a
//! half-written file. Separate processes sharing the same file are not
//! coordinated: the last full write wins.

use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tokio::{fs, sync::Mutex};
use tracing::{debug, warn};

use crate::{Error, Record, Result};

#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    backup_path: PathBuf,
    lock: Mutex<()>,
}

impl RecordStore {
    /// Store backed by `path`. Nothing is touched on disk until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut backup = OsString::from(path.as_os_str());
        backup.push(".bak");

        Self {
            path,
            backup_path: PathBuf::from(backup),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// All records, most recent first, optionally filtered by a
    /// case-insensitive substring of input text, city or country.
    pub async fn list(&self, filter: Option<&str>) -> Result<Vec<Record>> {
        let records = self.read_all().await?;

        let needle = filter.map(|f| f.trim().to_lowercase()).unwrap_or_default();
        if needle.is_empty() {
            return Ok(records);
        }

        Ok(records.into_iter().filter(|r| r.matches(&needle)).collect())
    }

    pub async fn get(&self, id: &str) -> Result<Record> {
        self.read_all()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))
    }

    /// Add a record at the front of the collection.
    pub async fn insert(&self, record: Record) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut records = self.load().await?;
        records.insert(0, record);
        self.persist(&records).await
    }

    /// Replace the record with `id`, keeping its position.
    pub async fn update(&self, id: &str, record: Record) -> Result<Record> {
        let _guard = self.lock.lock().await;

        let mut records = self.load().await?;
        let slot = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        *slot = record.clone();

        self.persist(&records).await?;
        Ok(record)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut records = self.load().await?;
        let idx = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        records.remove(idx);

        self.persist(&records).await
    }

    async fn read_all(&self) -> Result<Vec<Record>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Read the collection. A missing file is initialized as an empty one.
    async fn load(&self) -> Result<Vec<Record>> {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Record file missing, initializing");
                self.initialize().await?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(Error::persistence("read", &self.path, e)),
        };

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&text).map_err(|source| Error::CorruptData {
            path: self.path.clone(),
            source,
        })
    }

    async fn initialize(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::persistence("create directory", parent, e))?;
        }
        fs::write(&self.path, "[]")
            .await
            .map_err(|e| Error::persistence("initialize", &self.path, e))
    }

    async fn persist(&self, records: &[Record]) -> Result<()> {
        if fs::try_exists(&self.path).await.unwrap_or(false) {
            if let Err(e) = fs::copy(&self.path, &self.backup_path).await {
                warn!(
                    backup = %self.backup_path.display(),
                    error = %e,
                    "Failed to back up record file, writing anyway"
                );
            }
        }

        let json = serde_json::to_string_pretty(records).map_err(|source| Error::CorruptData {
            path: self.path.clone(),
            source,
        })?;

        fs::write(&self.path, json)
            .await
            .map_err(|e| Error::persistence("write", &self.path, e))?;

        debug!(path = %self.path.display(), count = records.len(), "Persisted records");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DateRange;
    use chrono::Utc;

    fn record(id: &str, input: &str, city: &str, country: &str) -> Record {
        let now = Utc::now();
        let today = now.date_naive();
        Record {
            id: id.into(),
            location_input: input.into(),
            resolved_city: city.into(),
            country: country.into(),
            lat: 1.0,
            lon: 2.0,
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

    fn store() -> (tempfile::TempDir, RecordStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("data").join("weather_records.json"));
        (dir, store)
    }

    #[tokio::test]
    async fn missing_file_is_initialized_empty() {
        let (_dir, store) = store();
        assert!(store.list(None).await.unwrap().is_empty());
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text, "[]");
    }

    #[tokio::test]
    async fn empty_file_reads_as_empty_collection() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "").unwrap();
        assert!(store.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.list(None).await, Err(Error::CorruptData { .. })));
    }

    #[tokio::test]
    async fn insert_prepends() {
        let (_dir, store) = store();
        store.insert(record("a", "Oslo", "Oslo", "Norway")).await.unwrap();
        store.insert(record("b", "Rome", "Rome", "Italy")).await.unwrap();

        let ids: Vec<_> = store.list(None).await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[tokio::test]
    async fn filter_matches_any_field_case_insensitively() {
        let (_dir, store) = store();
        store.insert(record("1", "Paris", "Paris", "FR")).await.unwrap();
        store.insert(record("2", "60311", "Frankfurt", "Germany")).await.unwrap();
        store.insert(record("3", "Tokyo", "Tokyo", "Japan")).await.unwrap();

        let mut ids: Vec<_> = store
            .list(Some("fr"))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        ids.sort();
        assert_eq!(ids, ["1", "2"]);

        assert_eq!(store.list(Some("  ")).await.unwrap().len(), 3);
        assert!(store.list(Some("zzz")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_replaces_in_place() {
        let (_dir, store) = store();
        store.insert(record("a", "Oslo", "Oslo", "Norway")).await.unwrap();
        store.insert(record("b", "Rome", "Rome", "Italy")).await.unwrap();

        let mut changed = store.get("a").await.unwrap();
        changed.location_input = "Bergen".into();
        store.update("a", changed).await.unwrap();

        let records = store.list(None).await.unwrap();
        assert_eq!(records[1].id, "a");
        assert_eq!(records[1].location_input, "Bergen");
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let (_dir, store) = store();
        let err = store.update("nope", record("nope", "x", "x", "x")).await.unwrap_err();
        assert!(matches!(err, Error::RecordNotFound(_)));
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found() {
        let (_dir, store) = store();
        store.insert(record("a", "Oslo", "Oslo", "Norway")).await.unwrap();

        store.delete("a").await.unwrap();
        assert!(matches!(store.delete("a").await, Err(Error::RecordNotFound(_))));
        assert!(matches!(store.delete("never").await, Err(Error::RecordNotFound(_))));
        assert!(store.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn backup_holds_previous_version() {
        let (_dir, store) = store();
        store.insert(record("a", "Oslo", "Oslo", "Norway")).await.unwrap();
        store.insert(record("b", "Rome", "Rome", "Italy")).await.unwrap();

        let backup: Vec<Record> =
            serde_json::from_str(&std::fs::read_to_string(store.backup_path()).unwrap()).unwrap();
        assert_eq!(backup.len(), 1);
        assert_eq!(backup[0].id, "a");
    }

    #[tokio::test]
    async fn backup_failure_does_not_block_write() {
        let (_dir, store) = store();
        store.insert(record("a", "Oslo", "Oslo", "Norway")).await.unwrap();
        // A directory where the backup file should go makes the copy fail.
        std::fs::create_dir_all(store.backup_path()).unwrap();

        store.insert(record("b", "Rome", "Rome", "Italy")).await.unwrap();
        assert_eq!(store.list(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_inserts_are_not_lost() {
        let (_dir, store) = store();
        let store = std::sync::Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .insert(record(&i.to_string(), "Oslo", "Oslo", "Norway"))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.list(None).await.unwrap().len(), 8);
    }
}
