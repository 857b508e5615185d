use async_trait::async_trait;
use std::path::PathBuf;

pub mod ffmpeg;

pub use ffmpeg::FfmpegTranscoder;

use crate::progress::ProgressSink;
use crate::Result;

/// Portion of the input to transcode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    /// Seek offset in seconds
    pub start: f64,
    /// Length in seconds
    pub duration: f64,
}

/// One audio transcode: input container to compressed audio file
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeJob {
    pub input: PathBuf,
    pub output: PathBuf,
    /// `None` transcodes the whole input
    pub range: Option<TimeRange>,
    /// Expected output length in seconds, used to turn timestamps into percent
    pub expected_duration: Option<f64>,
}

impl TranscodeJob {
    /// Transcode the entire input
    pub fn full(input: impl Into<PathBuf>, output: impl Into<PathBuf>, duration: Option<f64>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            range: None,
            expected_duration: duration,
        }
    }

    /// Transcode `[start, start + duration)` of the input
    pub fn slice(input: impl Into<PathBuf>, output: impl Into<PathBuf>, start: f64, duration: f64) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            range: Some(TimeRange { start, duration }),
            expected_duration: Some(duration),
        }
    }
}

/// Audio transcoding backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Run `job`, overwriting the output
    async fn transcode(&self, job: &TranscodeJob, progress: Box<dyn ProgressSink>) -> Result<()>;
}
