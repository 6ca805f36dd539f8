use std::sync::Arc;

use log::{debug, info, warn};

use crate::{
    models::ProgressRecord,
    notify::{Notification, Notifier},
    playback::PlaybackSession,
    settings::PlayerSettings,
    store::ProgressStore,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResumeDecision {
    /// Never watched.
    StartFresh,
    /// Watched to the end before; play it again from the top.
    Restart,
    Resume { position_seconds: f64 },
}

impl ResumeDecision {
    pub fn decide(record: Option<&ProgressRecord>) -> Self {
        match record {
            None => Self::StartFresh,
            Some(record) if record.completed => Self::Restart,
            Some(record) => Self::Resume {
                position_seconds: record.last_position_seconds,
            },
        }
    }

    pub fn start_position(&self) -> f64 {
        match self {
            Self::StartFresh | Self::Restart => 0.0,
            Self::Resume { position_seconds } => *position_seconds,
        }
    }
}

/// Decides where a freshly selected video starts.
pub struct ResumeController {
    store: ProgressStore,
    notifier: Arc<dyn Notifier>,
    notification_duration_ms: u64,
}

impl ResumeController {
    pub fn new(store: ProgressStore, notifier: Arc<dyn Notifier>, settings: &PlayerSettings) -> Self {
        Self {
            store,
            notifier,
            notification_duration_ms: settings.notification_duration_ms,
        }
    }

    pub async fn resume(&self, session: &PlaybackSession) -> ResumeDecision {
        let record = self.store.get_one(session.video_id()).await;
        let decision = ResumeDecision::decide(record.as_ref());

        match decision {
            ResumeDecision::StartFresh => {
                debug!("No saved progress for {}", session.video_id());
            }
            ResumeDecision::Restart => {
                info!("{} was finished before, starting over", session.video_id());
                if let Err(err) = session.seek(0.0) {
                    warn!("Failed to rewind {}: {err:#}", session.video_id());
                }
            }
            ResumeDecision::Resume { position_seconds } => {
                if let Err(err) = session.seek(position_seconds) {
                    warn!(
                        "Failed to resume {} at {position_seconds}s: {err:#}",
                        session.video_id()
                    );
                    return ResumeDecision::StartFresh;
                }
                info!("Resuming {} at {position_seconds}s", session.video_id());
                self.notifier.notify(Notification::progress_restored(
                    position_seconds,
                    self.notification_duration_ms,
                ));
            }
        }

        decision
    }
}
