//! Chapter Extractor - download a video, extract its audio and one clip per chapter
//!
//! The pipeline is sequential: fetch metadata, download the container, transcode
//! the full audio track, then transcode each chapter range. Downloading is
//! delegated to yt-dlp and transcoding to ffmpeg behind the [`MediaFetcher`] and
//! [`Transcoder`] traits.

pub mod cli;
pub mod config;
pub mod fetch;
pub mod pipeline;
pub mod progress;
pub mod prompt;
pub mod transcode;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use fetch::{Chapter, MediaFetcher, VideoMetadata};
pub use pipeline::{ChapterOutcome, ChapterStatus, OutputLayout, VideoPipeline, VideoReport};
pub use progress::{ProgressReporter, ProgressSink};
pub use transcode::{TranscodeJob, Transcoder};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the extractor
#[derive(thiserror::Error, Debug)]
pub enum ExtractorError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Metadata fetch failed: {0}")]
    MetadataFetch(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Transcode failed: {0}")]
    Transcode(String),

    #[error("Invalid chapter {index}: {reason}")]
    InvalidChapter { index: usize, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}
