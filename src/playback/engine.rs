use anyhow::Result;

/// Opaque handle to whatever actually decodes and renders the media.
///
/// Telemetry flows the other way: the engine glue reports time and end of
/// media through [`PlaybackSession::report_timing`] and
/// [`PlaybackSession::report_ended`].
///
/// [`PlaybackSession::report_timing`]: super::PlaybackSession::report_timing
/// [`PlaybackSession::report_ended`]: super::PlaybackSession::report_ended
pub trait MediaEngine: Send + Sync {
    fn load(&self, media_ref: &str) -> Result<()>;
    fn play(&self) -> Result<()>;
    fn pause(&self) -> Result<()>;
    fn seek(&self, seconds: f64) -> Result<()>;
    fn set_muted(&self, muted: bool) -> Result<()>;

    /// Releases the current media. Called when its session is torn down.
    fn unload(&self) {}
}
