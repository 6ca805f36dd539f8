//! Durable progress persistence.
//!
//! The whole [`ProgressTable`] lives as one JSON blob under a single storage
//! key. Storage failures never leave this module: unreadable data loads as an
//! empty table, an upsert that cannot read the table is dropped, and failed
//! writes are logged and dropped.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::{ProgressRecord, ProgressTable, VideoRecord, VideoWithProgress};
use crate::settings::DEFAULT_STORAGE_KEY;

mod memory;
mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_warn};

/// Durable string key/value medium the progress table is written to.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>>;
    async fn write(&self, key: &str, value: String) -> Result<()>;
}

#[derive(Clone)]
pub struct ProgressStore {
    backend: Arc<dyn StorageBackend>,
    key: Arc<str>,
    // Serializes read-modify-write cycles within this process.
    write_lock: Arc<Mutex<()>>,
}

impl ProgressStore {
    pub fn new(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        let key: String = key.into();
        Self {
            backend,
            key: Arc::from(key),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Store backed by a fresh [`MemoryStorage`] under the default key.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), DEFAULT_STORAGE_KEY)
    }

    /// Reads the persisted table. Absent or malformed data yields an empty table.
    pub async fn load(&self) -> ProgressTable {
        match self.try_load().await {
            Ok(table) => table,
            Err(err) => {
                log_warn!("Failed to read progress under '{}': {err:#}", self.key);
                ProgressTable::new()
            }
        }
    }

    // Absent or malformed data is an empty table; backend failures are errors.
    async fn try_load(&self) -> Result<ProgressTable> {
        let Some(raw) = self.backend.read(&self.key).await? else {
            return Ok(ProgressTable::new());
        };

        match serde_json::from_str::<ProgressTable>(&raw) {
            Ok(table) => Ok(table),
            Err(err) => {
                log_warn!(
                    "Discarding malformed progress data under '{}': {err}",
                    self.key
                );
                Ok(ProgressTable::new())
            }
        }
    }

    /// Replaces the persisted table. Last writer wins.
    pub async fn save(&self, table: &ProgressTable) {
        let _guard = self.write_lock.lock().await;
        self.write_table(table).await;
    }

    pub async fn get_one(&self, video_id: &str) -> Option<ProgressRecord> {
        self.load().await.remove(video_id)
    }

    /// Inserts or replaces one record, rewriting the whole table.
    pub async fn upsert_one(&self, record: ProgressRecord) {
        let record = record.sanitized();
        let _guard = self.write_lock.lock().await;

        // Writing back over an unread table would drop every other record.
        let mut table = match self.try_load().await {
            Ok(table) => table,
            Err(err) => {
                log_error!(
                    "Dropping progress update for {}, read of '{}' failed: {err:#}",
                    record.video_id,
                    self.key
                );
                return;
            }
        };
        log_debug!(
            "Saving progress for {}: {:.1}% at {:.1}s (completed: {})",
            record.video_id,
            record.progress_percent,
            record.last_position_seconds,
            record.completed
        );
        table.insert(record.video_id.clone(), record);
        self.write_table(&table).await;
    }

    /// Joins each catalog entry with its saved progress using a single read.
    pub async fn load_catalog_progress(&self, videos: &[VideoRecord]) -> Vec<VideoWithProgress> {
        let mut table = self.load().await;
        videos
            .iter()
            .map(|video| VideoWithProgress {
                video: video.clone(),
                progress: table.remove(&video.id),
            })
            .collect()
    }

    async fn write_table(&self, table: &ProgressTable) {
        let serialized = match serde_json::to_string(table) {
            Ok(serialized) => serialized,
            Err(err) => {
                log_error!("Failed to serialize progress table: {err}");
                return;
            }
        };

        if let Err(err) = self.backend.write(&self.key, serialized).await {
            log_error!(
                "Dropping progress update, write to '{}' failed: {err:#}",
                self.key
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    fn record(id: &str, position: f64, completed: bool) -> ProgressRecord {
        ProgressRecord {
            video_id: id.into(),
            progress_percent: position / 2.0,
            last_position_seconds: position,
            completed,
            last_watched_at: at("2024-03-10T08:30:00Z"),
        }
    }

    fn store_with(storage: &Arc<MemoryStorage>) -> ProgressStore {
        ProgressStore::new(storage.clone(), "videoProgress")
    }

    #[tokio::test]
    async fn upsert_round_trips() {
        let store = ProgressStore::in_memory();
        let saved = record("1", 42.0, false);

        store.upsert_one(saved.clone()).await;

        assert_eq!(store.get_one("1").await, Some(saved));
        assert_eq!(store.get_one("2").await, None);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_record_only() {
        let store = ProgressStore::in_memory();
        store.upsert_one(record("1", 10.0, false)).await;
        store.upsert_one(record("2", 20.0, false)).await;
        store.upsert_one(record("1", 60.0, true)).await;

        let table = store.load().await;
        assert_eq!(table.len(), 2);
        assert_eq!(table["1"].last_position_seconds, 60.0);
        assert!(table["1"].completed);
        assert_eq!(table["2"].last_position_seconds, 20.0);
    }

    #[tokio::test]
    async fn upsert_keeps_bounds() {
        let store = ProgressStore::in_memory();
        let mut wild = record("1", 10.0, false);
        wild.progress_percent = 250.0;
        wild.last_position_seconds = -4.0;

        store.upsert_one(wild).await;

        let stored = store.get_one("1").await.unwrap();
        assert_eq!(stored.progress_percent, 100.0);
        assert_eq!(stored.last_position_seconds, 0.0);
    }

    #[tokio::test]
    async fn saving_same_table_is_byte_stable() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        let mut table = ProgressTable::new();
        for id in ["b", "a", "c"] {
            table.insert(id.into(), record(id, 12.0, false));
        }

        store.save(&table).await;
        let first = storage.raw("videoProgress").unwrap();
        store.save(&table).await;
        let second = storage.raw("videoProgress").unwrap();

        assert_eq!(first, second);
        assert_eq!(store.load().await, table);
    }

    #[tokio::test]
    async fn truncated_json_loads_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert_raw("videoProgress", r#"{"1":{"videoId":"1","progress":4"#);

        let store = store_with(&storage);
        assert!(store.load().await.is_empty());
        assert_eq!(store.get_one("1").await, None);
    }

    #[tokio::test]
    async fn malformed_blob_is_replaced_on_next_write() {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert_raw("videoProgress", "not json");
        let store = store_with(&storage);

        store.upsert_one(record("9", 4.0, false)).await;

        let table = store.load().await;
        assert_eq!(table.len(), 1);
        assert!(table.contains_key("9"));
    }

    #[tokio::test]
    async fn failed_writes_are_dropped_silently() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        store.upsert_one(record("1", 10.0, false)).await;

        storage.set_fail_writes(true);
        store.upsert_one(record("1", 80.0, false)).await;
        store.upsert_one(record("2", 5.0, false)).await;

        storage.set_fail_writes(false);
        let table = store.load().await;
        assert_eq!(table.len(), 1);
        assert_eq!(table["1"].last_position_seconds, 10.0);
    }

    #[tokio::test]
    async fn read_errors_load_empty() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        store.upsert_one(record("1", 10.0, false)).await;

        storage.set_fail_reads(true);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn upsert_during_read_outage_keeps_existing_records() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        store.upsert_one(record("1", 10.0, false)).await;
        store.upsert_one(record("3", 30.0, true)).await;

        storage.set_fail_reads(true);
        store.upsert_one(record("2", 20.0, false)).await;
        storage.set_fail_reads(false);

        let table = store.load().await;
        assert_eq!(table.len(), 2);
        assert_eq!(table["1"].last_position_seconds, 10.0);
        assert!(table["3"].completed);
        assert!(!table.contains_key("2"));
    }

    #[tokio::test]
    async fn concurrent_upserts_do_not_lose_records() {
        let store = ProgressStore::in_memory();
        let mut handles = Vec::new();
        for n in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.upsert_one(record(&n.to_string(), 1.0, false)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.load().await.len(), 16);
    }

    #[tokio::test]
    async fn catalog_progress_joins_by_id() {
        let store = ProgressStore::in_memory();
        store.upsert_one(record("2", 30.0, true)).await;

        let videos: Vec<VideoRecord> = ["1", "2"]
            .iter()
            .map(|id| VideoRecord {
                id: id.to_string(),
                title: format!("Video {id}"),
                description: String::new(),
                thumbnail_url: String::new(),
                media_ref: format!("https://cdn.example/{id}.mp4"),
                duration_label: "1:00".into(),
                category: "training".into(),
            })
            .collect();

        let joined = store.load_catalog_progress(&videos).await;
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].progress, None);
        assert_eq!(joined[0].display_percent(), None);
        assert!(joined[1].is_completed());
        assert_eq!(joined[1].display_percent(), Some(100.0));
    }
}
