use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::{
    sync::{
        broadcast::{
            self,
            error::{RecvError, TryRecvError},
        },
        watch, Mutex,
    },
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    models::VideoRecord,
    notify::Notifier,
    playback::{MediaEngine, PlaybackEvent, PlaybackSession},
    progress::{ProgressTracker, ResumeController},
    settings::PlayerSettings,
    store::ProgressStore,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

struct ActiveSession {
    session: PlaybackSession,
    cancel_token: CancellationToken,
    ticker: Option<JoinHandle<()>>,
}

impl ActiveSession {
    /// Cancels the ticker, waits for it to exit, then releases the media.
    async fn stop(&mut self) {
        self.cancel_token.cancel();

        if let Some(handle) = self.ticker.take() {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    log_error!(
                        "Progress ticker for {} failed: {err}",
                        self.session.video_id()
                    );
                }
            }
        }

        self.session.teardown();
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Owns the single "now playing" session and its progress ticker.
#[derive(Clone)]
pub struct PlayerController {
    engine: Arc<dyn MediaEngine>,
    store: ProgressStore,
    notifier: Arc<dyn Notifier>,
    settings: PlayerSettings,
    progress: Arc<watch::Sender<f64>>,
    active: Arc<Mutex<Option<ActiveSession>>>,
}

impl PlayerController {
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        store: ProgressStore,
        notifier: Arc<dyn Notifier>,
        settings: PlayerSettings,
    ) -> Self {
        let (progress, _) = watch::channel(0.0);
        Self {
            engine,
            store,
            notifier,
            settings,
            progress: Arc::new(progress),
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    /// Live percentage of the current video, for progress bars.
    pub fn current_progress(&self) -> watch::Receiver<f64> {
        self.progress.subscribe()
    }

    pub async fn current_session(&self) -> Option<PlaybackSession> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|active| active.session.clone())
    }

    pub async fn now_playing(&self) -> Option<VideoRecord> {
        self.current_session()
            .await
            .map(|session| session.video().clone())
    }

    /// Replaces whatever is playing with `video`.
    ///
    /// The previous video's ticker has fully exited before the new session is
    /// built, so no late tick can write progress for it afterwards.
    pub async fn select_video(&self, video: VideoRecord) -> Result<PlaybackSession> {
        let mut active = self.active.lock().await;

        let muted = match active.take() {
            Some(mut previous) => {
                let muted = previous.session.is_muted();
                previous.stop().await;
                muted
            }
            None => false,
        };
        self.progress.send_replace(0.0);

        let session = PlaybackSession::load(video, self.engine.clone(), muted)?;

        let decision = ResumeController::new(self.store.clone(), self.notifier.clone(), &self.settings)
            .resume(&session)
            .await;
        log_info!("Now playing {} ({decision:?})", session.video_id());

        let tracker = ProgressTracker::new(
            session.video(),
            self.store.clone(),
            self.notifier.clone(),
            &self.settings,
            self.progress.clone(),
        );

        // Subscribe before spawning so no event slips past the ticker.
        let events = session.subscribe();
        let cancel_token = CancellationToken::new();
        let ticker = tokio::spawn(track_progress(
            session.clone(),
            tracker,
            events,
            self.settings.save_interval(),
            cancel_token.clone(),
        ));

        *active = Some(ActiveSession {
            session: session.clone(),
            cancel_token,
            ticker: Some(ticker),
        });

        Ok(session)
    }

    /// Stops the ticker and releases the current media, if any.
    pub async fn shutdown(&self) {
        let mut active = self.active.lock().await;
        if let Some(mut previous) = active.take() {
            previous.stop().await;
        }
        self.progress.send_replace(0.0);
    }
}

async fn track_progress(
    session: PlaybackSession,
    mut tracker: ProgressTracker,
    mut events: broadcast::Receiver<PlaybackEvent>,
    save_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + save_interval, save_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // Cancellation first, then events, so an end of media always beats a
        // tick that became ready at the same time.
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                flush_pending_end(&mut tracker, &mut events).await;
                log_debug!("Progress ticker for {} stopped", tracker.video_id());
                break;
            }
            event = events.recv() => match event {
                Ok(PlaybackEvent::TimingUpdate { current_time, duration }) => {
                    tracker.on_timing_update(current_time, duration);
                }
                Ok(PlaybackEvent::Ended { duration }) => {
                    tracker.on_ended(duration).await;
                    break;
                }
                Ok(PlaybackEvent::StatusChanged(_)) => {}
                Err(RecvError::Lagged(skipped)) => {
                    log_debug!("Progress ticker for {} skipped {skipped} events", tracker.video_id());
                }
                Err(RecvError::Closed) => break,
            },
            _ = ticker.tick() => {
                let snapshot = session.snapshot();
                if snapshot.is_playing() {
                    tracker.on_tick(&snapshot).await;
                }
            }
        }
    }
}

// An end of media reported just before a switch still has to be recorded.
async fn flush_pending_end(
    tracker: &mut ProgressTracker,
    events: &mut broadcast::Receiver<PlaybackEvent>,
) {
    loop {
        match events.try_recv() {
            Ok(PlaybackEvent::Ended { duration }) => {
                tracker.on_ended(duration).await;
                return;
            }
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty | TryRecvError::Closed) => return,
        }
    }
}
