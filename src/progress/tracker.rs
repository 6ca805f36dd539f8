use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;

use crate::{
    models::{is_valid_telemetry, percent_of, ProgressRecord, VideoRecord},
    notify::{Notification, Notifier},
    playback::PlaybackState,
    settings::PlayerSettings,
    store::ProgressStore,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Turns playback telemetry for one video into progress records.
pub struct ProgressTracker {
    video_id: String,
    title: String,
    store: ProgressStore,
    notifier: Arc<dyn Notifier>,
    threshold_secs: f64,
    notification_duration_ms: u64,
    current: Arc<watch::Sender<f64>>,
    finished: bool,
}

impl ProgressTracker {
    /// `current` receives the live percentage for progress bars.
    pub fn new(
        video: &VideoRecord,
        store: ProgressStore,
        notifier: Arc<dyn Notifier>,
        settings: &PlayerSettings,
        current: Arc<watch::Sender<f64>>,
    ) -> Self {
        Self {
            video_id: video.id.clone(),
            title: video.title.clone(),
            store,
            notifier,
            threshold_secs: settings.resume_threshold_secs,
            notification_duration_ms: settings.notification_duration_ms,
            current,
            finished: false,
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    /// Refreshes the in-memory percentage. Never touches the store.
    pub fn on_timing_update(&self, current_time: f64, duration: f64) {
        if !is_valid_telemetry(current_time, duration) {
            return;
        }
        self.current
            .send_replace(percent_of(current_time.min(duration), duration));
    }

    /// Periodic save. Returns the record written, or `None` when the tick was skipped.
    pub async fn on_tick(&mut self, snapshot: &PlaybackState) -> Option<ProgressRecord> {
        if self.finished {
            return None;
        }

        let Some(duration) = snapshot.duration else {
            log_debug!("Skipping save for {}: duration not known yet", self.video_id);
            return None;
        };

        let Some(record) = ProgressRecord::checkpoint(
            &self.video_id,
            snapshot.current_time,
            duration,
            self.threshold_secs,
            Utc::now(),
        ) else {
            log_debug!(
                "Skipping save for {}: invalid telemetry {}/{}",
                self.video_id,
                snapshot.current_time,
                duration
            );
            return None;
        };

        self.store.upsert_one(record.clone()).await;
        Some(record)
    }

    /// Authoritative completion: full progress, written through immediately.
    pub async fn on_ended(&mut self, duration: f64) -> ProgressRecord {
        self.finished = true;

        let record = ProgressRecord::finished(&self.video_id, duration, Utc::now());
        self.store.upsert_one(record.clone()).await;
        self.current.send_replace(100.0);

        log_info!("Video {} watched to the end", self.video_id);
        self.notifier.notify(Notification::video_completed(
            &self.title,
            self.notification_duration_ms,
        ));
        record
    }
}
