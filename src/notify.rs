use log::{info, warn};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::progress::format::format_timestamp;

/// Toast shown to the viewer. Fire and forget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub duration_ms: u64,
}

impl Notification {
    pub fn progress_restored(position_seconds: f64, duration_ms: u64) -> Self {
        Self {
            title: "Progress restored".into(),
            description: format!("Resuming from {}", format_timestamp(position_seconds)),
            duration_ms,
        }
    }

    pub fn video_completed(title: &str, duration_ms: u64) -> Self {
        Self {
            title: "Video completed".into(),
            description: format!("You finished \"{title}\""),
            duration_ms,
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log. Default when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        info!("{}: {}", notification.title, notification.description);
    }
}

/// Forwards notifications to whatever renders them on the other end of the channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            warn!("Notification receiver dropped; toast discarded");
        }
    }
}
