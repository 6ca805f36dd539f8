use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

/// Time-from-end window inside which playback counts as finished.
pub const RESUME_THRESHOLD_SECS: f64 = 10.0;

pub const DEFAULT_SAVE_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_STORAGE_KEY: &str = "videoProgress";
pub const DEFAULT_NOTIFICATION_DURATION_MS: u64 = 3_000;

// tokio intervals panic on a zero period
const MIN_SAVE_INTERVAL_MS: u64 = 100;

const SAVE_INTERVAL_ENV: &str = "WATCHROOM_SAVE_INTERVAL_MS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerSettings {
    pub save_interval_ms: u64,
    pub resume_threshold_secs: f64,
    pub storage_key: String,
    pub notification_duration_ms: u64,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            save_interval_ms: DEFAULT_SAVE_INTERVAL_MS,
            resume_threshold_secs: RESUME_THRESHOLD_SECS,
            storage_key: DEFAULT_STORAGE_KEY.into(),
            notification_duration_ms: DEFAULT_NOTIFICATION_DURATION_MS,
        }
    }
}

impl PlayerSettings {
    pub fn save_interval(&self) -> Duration {
        Duration::from_millis(self.save_interval_ms.max(MIN_SAVE_INTERVAL_MS))
    }

    /// Applies `WATCHROOM_SAVE_INTERVAL_MS` when it holds a valid number.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var(SAVE_INTERVAL_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(value) => self.save_interval_ms = value,
                Err(err) => warn!("Ignoring {SAVE_INTERVAL_ENV}={raw:?}: {err}"),
            }
        }
        self
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<PlayerSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Settings at {} are malformed, using defaults: {err}",
                    path.display()
                );
                PlayerSettings::default()
            })
        } else {
            PlayerSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Current settings with environment overrides applied.
    pub fn player(&self) -> PlayerSettings {
        self.read().clone().with_env_overrides()
    }

    pub fn update_player(&self, settings: PlayerSettings) -> Result<()> {
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: PlayerSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings at {}", self.path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &PlayerSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, PlayerSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, PlayerSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
