use anyhow::{bail, Result};
use async_trait::async_trait;

use super::StorageBackend;
use crate::db::Database;

/// Same ceiling browsers apply to local storage.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Storage backed by the `kv_store` table of the app database.
#[derive(Clone)]
pub struct SqliteStorage {
    db: Database,
    quota_bytes: Option<usize>,
}

impl SqliteStorage {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            quota_bytes: Some(DEFAULT_QUOTA_BYTES),
        }
    }

    /// Caps the size of any single value; `None` lifts the cap.
    pub fn with_quota(mut self, quota_bytes: Option<usize>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }
}

#[async_trait]
impl StorageBackend for SqliteStorage {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        self.db.get_value(key).await
    }

    async fn write(&self, key: &str, value: String) -> Result<()> {
        if let Some(quota) = self.quota_bytes {
            if value.len() > quota {
                bail!(
                    "storage quota exceeded: {} bytes for '{key}' (limit {quota})",
                    value.len()
                );
            }
        }
        self.db.put_value(key, value).await
    }
}
