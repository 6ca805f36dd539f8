use serde::{Deserialize, Serialize};

use super::ProgressRecord;
use crate::progress::format::parse_duration_label;

/// Catalog entry. Owned by the catalog provider; the progress core only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(rename = "videoUrl")]
    pub media_ref: String,
    #[serde(rename = "duration")]
    pub duration_label: String,
    #[serde(default)]
    pub category: String,
}

impl VideoRecord {
    /// Advertised length in seconds, when the label parses.
    pub fn duration_hint(&self) -> Option<f64> {
        parse_duration_label(&self.duration_label)
    }
}

/// A catalog entry joined with its saved progress, for library badges.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoWithProgress {
    #[serde(flatten)]
    pub video: VideoRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressRecord>,
}

impl VideoWithProgress {
    pub fn display_percent(&self) -> Option<f64> {
        self.progress.as_ref().map(ProgressRecord::display_percent)
    }

    pub fn is_completed(&self) -> bool {
        self.progress.as_ref().is_some_and(|p| p.completed)
    }
}
