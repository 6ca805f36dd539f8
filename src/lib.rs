pub mod catalog;
pub mod db;
pub mod models;
pub mod notify;
pub mod playback;
pub mod player;
pub mod progress;
pub mod settings;
pub mod store;
pub mod utils;

use std::{path::Path, sync::Arc};

use anyhow::{anyhow, Context, Result};

pub use catalog::{Catalog, ALL_CATEGORIES};
pub use db::Database;
pub use models::{ProgressRecord, ProgressTable, VideoRecord, VideoWithProgress};
pub use notify::{ChannelNotifier, LogNotifier, Notification, Notifier};
pub use playback::{MediaEngine, PlaybackEvent, PlaybackSession, PlaybackState, PlaybackStatus};
pub use player::PlayerController;
pub use progress::{ProgressTracker, ResumeController, ResumeDecision};
pub use settings::{PlayerSettings, SettingsStore, RESUME_THRESHOLD_SECS};
pub use store::{MemoryStorage, ProgressStore, SqliteStorage, StorageBackend};

/// The viewing room: a catalog, one player, and the progress it leaves behind.
pub struct WatchRoom {
    catalog: Catalog,
    player: PlayerController,
    settings: Option<SettingsStore>,
}

impl WatchRoom {
    /// Opens (or creates) the room's database and settings under `data_dir`.
    pub fn open(
        data_dir: &Path,
        catalog: Catalog,
        engine: Arc<dyn MediaEngine>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        utils::logging::init();

        std::fs::create_dir_all(data_dir).with_context(|| {
            format!("failed to create data directory {}", data_dir.display())
        })?;

        let settings_store = SettingsStore::new(data_dir.join("settings.json"))?;
        let settings = settings_store.player();

        let database = Database::new(data_dir.join("watchroom.sqlite3"))?;
        let store = ProgressStore::new(
            Arc::new(SqliteStorage::new(database)),
            settings.storage_key.clone(),
        );

        log::info!(
            "Watch room opened at {} with {} videos",
            data_dir.display(),
            catalog.videos().len()
        );

        Ok(Self {
            catalog,
            player: PlayerController::new(engine, store, notifier, settings),
            settings: Some(settings_store),
        })
    }

    /// A room whose progress lives only as long as the process.
    pub fn in_memory(
        catalog: Catalog,
        engine: Arc<dyn MediaEngine>,
        notifier: Arc<dyn Notifier>,
        settings: PlayerSettings,
    ) -> Self {
        let store = ProgressStore::new(Arc::new(MemoryStorage::new()), settings.storage_key.clone());
        Self {
            catalog,
            player: PlayerController::new(engine, store, notifier, settings),
            settings: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn player(&self) -> &PlayerController {
        &self.player
    }

    pub fn settings(&self) -> Option<&SettingsStore> {
        self.settings.as_ref()
    }

    pub fn categories(&self) -> Vec<String> {
        self.catalog.categories()
    }

    /// Catalog entries in `category` joined with their saved progress.
    pub async fn library(&self, category: &str) -> Vec<VideoWithProgress> {
        self.catalog.with_progress(self.player.store(), category).await
    }

    /// Starts a session for the catalog entry `video_id`.
    pub async fn select(&self, video_id: &str) -> Result<PlaybackSession> {
        let video = self
            .catalog
            .get(video_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown video '{video_id}'"))?;
        self.player.select_video(video).await
    }

    pub async fn shutdown(&self) {
        self.player.shutdown().await;
    }
}
