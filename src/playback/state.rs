use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Loaded,
    Playing,
    Paused,
    Ended,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub video_id: Option<String>,
    pub current_time: f64,
    /// `None` until the media engine reports a usable duration.
    pub duration: Option<f64>,
    pub muted: bool,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, video_id: String) {
        *self = Self {
            status: PlaybackStatus::Loaded,
            video_id: Some(video_id),
            muted: self.muted,
            ..Self::default()
        };
    }

    pub fn has_media(&self) -> bool {
        self.status != PlaybackStatus::Idle
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    pub fn can_play(&self) -> bool {
        matches!(self.status, PlaybackStatus::Loaded | PlaybackStatus::Paused)
    }

    /// Loaded or Paused to Playing. Returns whether the status changed.
    pub fn play(&mut self) -> bool {
        if !self.can_play() {
            return false;
        }
        self.status = PlaybackStatus::Playing;
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.status != PlaybackStatus::Playing {
            return false;
        }
        self.status = PlaybackStatus::Paused;
        true
    }

    /// Moves to the terminal `Ended` state, at most once per load.
    pub fn end(&mut self) -> bool {
        if !matches!(
            self.status,
            PlaybackStatus::Loaded | PlaybackStatus::Playing | PlaybackStatus::Paused
        ) {
            return false;
        }
        if let Some(duration) = self.duration {
            self.current_time = duration;
        }
        self.status = PlaybackStatus::Ended;
        true
    }

    /// Pins `seconds` to the playable range. With no known duration only the
    /// lower bound applies.
    pub fn clamp_time(&self, seconds: f64) -> f64 {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        match self.duration {
            Some(duration) => seconds.min(duration),
            None => seconds,
        }
    }

    /// Applies engine telemetry. A non-positive or non-finite duration counts as unknown.
    pub fn update_timing(&mut self, current_time: f64, duration: f64) {
        self.duration = (duration.is_finite() && duration > 0.0).then_some(duration);
        self.current_time = self.clamp_time(current_time);
    }
}
