use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use log::{debug, warn};
use tokio::sync::{broadcast, watch};

use super::{MediaEngine, PlaybackState, PlaybackStatus};
use crate::models::VideoRecord;

// Timing updates arrive several times a second; listeners that fall this far
// behind skip ahead.
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    TimingUpdate { current_time: f64, duration: f64 },
    StatusChanged(PlaybackStatus),
    Ended { duration: f64 },
}

/// The live controller for the selected video's media.
///
/// Cloning shares the same session. Listeners subscribe through
/// [`PlaybackSession::subscribe`]; dropping the receiver unsubscribes and
/// [`PlaybackSession::teardown`] closes every receiver.
#[derive(Clone)]
pub struct PlaybackSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    video: VideoRecord,
    engine: Arc<dyn MediaEngine>,
    state: Mutex<PlaybackState>,
    events: Mutex<Option<broadcast::Sender<PlaybackEvent>>>,
    playing: watch::Sender<bool>,
}

impl PlaybackSession {
    /// Hands the video's media to the engine and returns a session in `Loaded`.
    pub fn load(video: VideoRecord, engine: Arc<dyn MediaEngine>, muted: bool) -> Result<Self> {
        engine
            .load(&video.media_ref)
            .with_context(|| format!("failed to load media for video {}", video.id))?;
        if muted {
            if let Err(err) = engine.set_muted(true) {
                warn!("Failed to restore mute for video {}: {err:#}", video.id);
            }
        }

        let mut state = PlaybackState::new();
        state.load(video.id.clone());
        state.muted = muted;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (playing, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(SessionInner {
                video,
                engine,
                state: Mutex::new(state),
                events: Mutex::new(Some(events)),
                playing,
            }),
        })
    }

    pub fn video(&self) -> &VideoRecord {
        &self.inner.video
    }

    pub fn video_id(&self) -> &str {
        &self.inner.video.id
    }

    pub fn snapshot(&self) -> PlaybackState {
        self.state().clone()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.state().status
    }

    pub fn is_playing(&self) -> bool {
        self.state().is_playing()
    }

    pub fn is_muted(&self) -> bool {
        self.state().muted
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        match self.events().as_ref() {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = broadcast::channel(1);
                drop(tx);
                rx
            }
        }
    }

    pub fn subscribe_playing(&self) -> watch::Receiver<bool> {
        self.inner.playing.subscribe()
    }

    pub fn play(&self) -> Result<()> {
        if !self.state().can_play() {
            return Ok(());
        }
        self.inner
            .engine
            .play()
            .with_context(|| format!("media engine refused to play {}", self.video_id()))?;
        if self.state().play() {
            self.status_changed(PlaybackStatus::Playing);
        }
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        if !self.state().is_playing() {
            return Ok(());
        }
        self.inner
            .engine
            .pause()
            .with_context(|| format!("media engine refused to pause {}", self.video_id()))?;
        if self.state().pause() {
            self.status_changed(PlaybackStatus::Paused);
        }
        Ok(())
    }

    /// Returns whether the session is playing afterwards.
    pub fn toggle_play(&self) -> Result<bool> {
        if self.is_playing() {
            self.pause()?;
        } else {
            self.play()?;
        }
        Ok(self.is_playing())
    }

    /// Moves the playhead. Does nothing once the media is gone or has ended.
    pub fn seek(&self, seconds: f64) -> Result<()> {
        let target = {
            let state = self.state();
            if !state.has_media() || state.status == PlaybackStatus::Ended {
                debug!("Ignoring seek on {} in {:?}", self.video_id(), state.status);
                return Ok(());
            }
            state.clamp_time(seconds)
        };

        self.inner
            .engine
            .seek(target)
            .with_context(|| format!("media engine failed to seek {}", self.video_id()))?;

        let timing = {
            let mut state = self.state();
            state.current_time = target;
            state.duration.map(|duration| PlaybackEvent::TimingUpdate {
                current_time: target,
                duration,
            })
        };
        if let Some(event) = timing {
            self.emit(event);
        }
        Ok(())
    }

    /// Seeks to a fraction of the duration, as a progress-bar click does.
    pub fn seek_to_fraction(&self, fraction: f64) -> Result<()> {
        let Some(duration) = self.state().duration else {
            return Ok(());
        };
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        self.seek(fraction * duration)
    }

    pub fn set_muted(&self, muted: bool) -> Result<()> {
        self.inner
            .engine
            .set_muted(muted)
            .context("media engine failed to change mute")?;
        self.state().muted = muted;
        Ok(())
    }

    /// Returns the new mute state.
    pub fn toggle_muted(&self) -> Result<bool> {
        let muted = !self.is_muted();
        self.set_muted(muted)?;
        Ok(muted)
    }

    /// Engine telemetry: the playhead moved.
    pub fn report_timing(&self, current_time: f64, duration: f64) {
        let event = {
            let mut state = self.state();
            if !matches!(
                state.status,
                PlaybackStatus::Loaded | PlaybackStatus::Playing | PlaybackStatus::Paused
            ) {
                return;
            }
            state.update_timing(current_time, duration);
            state.duration.map(|duration| PlaybackEvent::TimingUpdate {
                current_time: state.current_time,
                duration,
            })
        };

        if let Some(event) = event {
            self.emit(event);
        }
    }

    /// Engine telemetry: playback reached the end. Only the first report counts.
    pub fn report_ended(&self) {
        let duration = {
            let mut state = self.state();
            if !state.end() {
                return;
            }
            state.duration.unwrap_or(state.current_time)
        };

        self.status_changed(PlaybackStatus::Ended);
        self.emit(PlaybackEvent::Ended { duration });
    }

    /// Releases the media and closes every listener.
    pub fn teardown(&self) {
        let had_media = {
            let mut state = self.state();
            let had_media = state.has_media();
            state.status = PlaybackStatus::Idle;
            had_media
        };

        if had_media {
            if let Err(err) = self.inner.engine.pause() {
                debug!("Pause during teardown of {} failed: {err:#}", self.video_id());
            }
            self.inner.engine.unload();
        }

        self.inner.playing.send_replace(false);
        self.events().take();
    }

    fn status_changed(&self, status: PlaybackStatus) {
        self.inner
            .playing
            .send_replace(status == PlaybackStatus::Playing);
        self.emit(PlaybackEvent::StatusChanged(status));
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(tx) = self.events().as_ref() {
            // No receivers is fine.
            let _ = tx.send(event);
        }
    }

    fn state(&self) -> MutexGuard<'_, PlaybackState> {
        match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn events(&self) -> MutexGuard<'_, Option<broadcast::Sender<PlaybackEvent>>> {
        match self.inner.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::playback::engine::testing::{EngineCall, RecordingEngine};

    fn video(id: &str) -> VideoRecord {
        VideoRecord {
            id: id.into(),
            title: format!("Video {id}"),
            description: String::new(),
            thumbnail_url: String::new(),
            media_ref: format!("https://cdn.example/{id}.mp4"),
            duration_label: "2:30".into(),
            category: "training".into(),
        }
    }

    fn session() -> (PlaybackSession, Arc<RecordingEngine>) {
        let engine = Arc::new(RecordingEngine::default());
        let session = PlaybackSession::load(video("1"), engine.clone(), false).unwrap();
        (session, engine)
    }

    #[test]
    fn load_hands_media_to_engine() {
        let (session, engine) = session();
        assert_eq!(session.status(), PlaybackStatus::Loaded);
        assert_eq!(
            engine.calls(),
            vec![EngineCall::Load("https://cdn.example/1.mp4".into())]
        );
    }

    #[test]
    fn play_pause_toggle_updates_observable() {
        let (session, _engine) = session();
        let playing = session.subscribe_playing();

        assert!(session.toggle_play().unwrap());
        assert!(*playing.borrow());
        assert_eq!(session.status(), PlaybackStatus::Playing);

        assert!(!session.toggle_play().unwrap());
        assert!(!*playing.borrow());
        assert_eq!(session.status(), PlaybackStatus::Paused);
    }

    #[test]
    fn refused_play_leaves_state_alone() {
        let (session, engine) = session();
        engine.fail_play.store(true, Ordering::SeqCst);

        assert!(session.play().is_err());
        assert_eq!(session.status(), PlaybackStatus::Loaded);
        assert!(!session.is_playing());
    }

    #[test]
    fn seek_clamps_to_duration() {
        let (session, engine) = session();
        session.report_timing(5.0, 100.0);

        session.seek(250.0).unwrap();
        assert_eq!(session.snapshot().current_time, 100.0);
        session.seek(-5.0).unwrap();
        assert_eq!(session.snapshot().current_time, 0.0);
        assert_eq!(engine.seeks(), vec![100.0, 0.0]);
    }

    #[test]
    fn seek_before_duration_is_known_only_clamps_low() {
        let (session, engine) = session();
        session.seek(42.0).unwrap();
        assert_eq!(session.snapshot().current_time, 42.0);
        assert_eq!(engine.seeks(), vec![42.0]);
    }

    #[test]
    fn seek_after_teardown_is_noop() {
        let (session, engine) = session();
        session.teardown();
        session.seek(10.0).unwrap();
        assert!(engine.seeks().is_empty());
        assert!(engine.calls().contains(&EngineCall::Unload));
    }

    #[test]
    fn seek_to_fraction_needs_duration() {
        let (session, engine) = session();
        session.seek_to_fraction(0.5).unwrap();
        assert!(engine.seeks().is_empty());

        session.report_timing(0.0, 80.0);
        session.seek_to_fraction(0.25).unwrap();
        assert_eq!(engine.seeks(), vec![20.0]);
    }

    #[test]
    fn toggle_muted_reaches_engine() {
        let (session, engine) = session();
        assert!(session.toggle_muted().unwrap());
        assert!(session.is_muted());
        assert!(!session.toggle_muted().unwrap());
        assert!(engine.calls().ends_with(&[EngineCall::Muted(true), EngineCall::Muted(false)]));
    }

    #[test]
    fn timing_updates_are_clamped_and_emitted() {
        let (session, _engine) = session();
        let mut events = session.subscribe();

        session.report_timing(120.0, 100.0);
        session.report_timing(3.0, f64::NAN);

        assert_eq!(
            events.try_recv().unwrap(),
            PlaybackEvent::TimingUpdate {
                current_time: 100.0,
                duration: 100.0
            }
        );
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn ended_fires_once() {
        let (session, _engine) = session();
        session.play().unwrap();
        session.report_timing(58.0, 60.0);
        let mut events = session.subscribe();

        session.report_ended();
        session.report_ended();
        session.report_timing(10.0, 60.0);

        assert_eq!(
            events.try_recv().unwrap(),
            PlaybackEvent::StatusChanged(PlaybackStatus::Ended)
        );
        assert_eq!(
            events.try_recv().unwrap(),
            PlaybackEvent::Ended { duration: 60.0 }
        );
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(session.snapshot().current_time, 60.0);
        assert!(!session.is_playing());
    }

    #[test]
    fn teardown_closes_listeners() {
        let (session, _engine) = session();
        let mut events = session.subscribe();
        session.teardown();

        assert!(matches!(events.try_recv(), Err(TryRecvError::Closed)));
        assert!(matches!(session.subscribe().try_recv(), Err(TryRecvError::Closed)));
        assert_eq!(session.status(), PlaybackStatus::Idle);
    }
}
