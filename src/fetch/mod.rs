use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

pub mod ytdlp;

pub use ytdlp::YtDlpFetcher;

use crate::progress::ProgressSink;
use crate::Result;

/// Metadata of a single video, as reported by the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,

    pub title: String,

    /// Duration in seconds, if known
    #[serde(default)]
    pub duration: Option<f64>,

    /// Chapters in source order; `null` and a missing field both mean none
    #[serde(default, deserialize_with = "null_as_empty")]
    pub chapters: Vec<Chapter>,
}

/// A named time range within a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// Start time in seconds
    pub start_time: f64,

    /// End time in seconds
    pub end_time: f64,

    #[serde(default)]
    pub title: String,
}

impl Chapter {
    pub fn new(start_time: f64, end_time: f64, title: impl Into<String>) -> Self {
        Self {
            start_time,
            end_time,
            title: title.into(),
        }
    }

    /// Length of the range in seconds
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Reject ranges ffmpeg cannot trim meaningfully
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            return Err("timestamps must be finite".to_string());
        }
        if self.start_time < 0.0 {
            return Err(format!("negative start time {}", self.start_time));
        }
        if self.end_time <= self.start_time {
            return Err(format!(
                "end time {} is not after start time {}",
                self.end_time, self.start_time
            ));
        }
        Ok(())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Chapter>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Chapter>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Retrieves metadata and media for a video URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Query title, id and chapters
    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata>;

    /// Download the selected format to `output`, overwriting it
    async fn download(&self, url: &str, output: &Path, progress: Box<dyn ProgressSink>) -> Result<()>;
}
