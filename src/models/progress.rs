use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every persisted progress record, keyed by video id.
///
/// Ordered so that serializing the same table always produces the same bytes.
pub type ProgressTable = BTreeMap<String, ProgressRecord>;

/// Persisted watch state for one video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub video_id: String,
    #[serde(rename = "progress")]
    pub progress_percent: f64,
    #[serde(rename = "lastPosition")]
    pub last_position_seconds: f64,
    pub completed: bool,
    #[serde(rename = "lastWatched")]
    pub last_watched_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Record for a periodic save at `current_time` into media of `duration`.
    ///
    /// Returns `None` when the telemetry can't produce a meaningful percentage.
    /// Completion here is the near-end heuristic: within `threshold_secs` of
    /// the end counts as finished, regardless of how short the media is.
    pub fn checkpoint(
        video_id: &str,
        current_time: f64,
        duration: f64,
        threshold_secs: f64,
        at: DateTime<Utc>,
    ) -> Option<Self> {
        if !is_valid_telemetry(current_time, duration) {
            return None;
        }

        let position = current_time.clamp(0.0, duration);
        Some(Self {
            video_id: video_id.to_string(),
            progress_percent: percent_of(position, duration),
            last_position_seconds: position,
            completed: position >= duration - threshold_secs,
            last_watched_at: at,
        })
    }

    /// Authoritative record written when the media reports its end.
    pub fn finished(video_id: &str, duration: f64, at: DateTime<Utc>) -> Self {
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        Self {
            video_id: video_id.to_string(),
            progress_percent: 100.0,
            last_position_seconds: duration,
            completed: true,
            last_watched_at: at,
        }
    }

    /// Percentage for badges and progress bars; a completed video always reads 100.
    pub fn display_percent(&self) -> f64 {
        if self.completed {
            100.0
        } else {
            self.progress_percent.clamp(0.0, 100.0)
        }
    }

    /// Pulls out-of-range numbers back inside their bounds.
    pub fn sanitized(mut self) -> Self {
        self.progress_percent = if self.progress_percent.is_finite() {
            self.progress_percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self.last_position_seconds = if self.last_position_seconds.is_finite() {
            self.last_position_seconds.max(0.0)
        } else {
            0.0
        };
        self
    }
}

/// Duration must be a positive finite number and the playhead a finite,
/// non-negative one.
pub fn is_valid_telemetry(current_time: f64, duration: f64) -> bool {
    duration.is_finite() && duration > 0.0 && current_time.is_finite() && current_time >= 0.0
}

pub fn percent_of(position: f64, duration: f64) -> f64 {
    (position / duration * 100.0).clamp(0.0, 100.0)
}
