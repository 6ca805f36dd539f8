use anyhow::{bail, Context, Result};
use std::collections::HashSet;

use crate::models::{VideoRecord, VideoWithProgress};
use crate::store::ProgressStore;

/// Pseudo-category that matches every video.
pub const ALL_CATEGORIES: &str = "all";

/// Ordered, read-only list of videos offered in the room.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    videos: Vec<VideoRecord>,
}

impl Catalog {
    pub fn new(videos: Vec<VideoRecord>) -> Result<Self> {
        let mut seen = HashSet::new();
        for video in &videos {
            if !seen.insert(video.id.as_str()) {
                bail!("duplicate video id '{}' in catalog", video.id);
            }
        }
        Ok(Self { videos })
    }

    /// Parses a JSON array of catalog entries.
    pub fn from_json(raw: &str) -> Result<Self> {
        let videos: Vec<VideoRecord> =
            serde_json::from_str(raw).context("failed to parse video catalog")?;
        Self::new(videos)
    }

    pub fn videos(&self) -> &[VideoRecord] {
        &self.videos
    }

    pub fn get(&self, id: &str) -> Option<&VideoRecord> {
        self.videos.iter().find(|video| video.id == id)
    }

    /// `"all"` followed by each category in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        std::iter::once(ALL_CATEGORIES.to_string())
            .chain(
                self.videos
                    .iter()
                    .filter(|video| seen.insert(video.category.as_str()))
                    .map(|video| video.category.clone()),
            )
            .collect()
    }

    pub fn filter(&self, category: &str) -> Vec<VideoRecord> {
        self.videos
            .iter()
            .filter(|video| category == ALL_CATEGORIES || video.category == category)
            .cloned()
            .collect()
    }

    /// Videos in `category` with their saved progress, for library badges.
    pub async fn with_progress(&self, store: &ProgressStore, category: &str) -> Vec<VideoWithProgress> {
        store.load_catalog_progress(&self.filter(category)).await
    }
}
