use std::path::{Path, PathBuf};
use tracing::Instrument;

use crate::fetch::Chapter;
use crate::progress::ProgressReporter;
use crate::transcode::{TranscodeJob, Transcoder};
use crate::utils::chapter_file_stem;
use crate::{ExtractorError, Result};

/// How a single chapter ended
#[derive(Debug, Clone, PartialEq)]
pub enum ChapterStatus {
    /// Transcoded into a new file
    Extracted,
    /// Destination already existed; nothing was done
    Skipped,
    /// Validation or transcode error
    Failed(String),
}

/// Result of one chapter within a video run
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterOutcome {
    /// Zero-based position in the chapter list
    pub index: usize,
    pub title: String,
    pub path: PathBuf,
    pub status: ChapterStatus,
}

/// Transcodes chapter ranges of a downloaded container
pub struct ChapterExtractor<'a> {
    transcoder: &'a dyn Transcoder,
    reporter: &'a dyn ProgressReporter,
    audio_ext: &'a str,
}

impl<'a> ChapterExtractor<'a> {
    pub fn new(transcoder: &'a dyn Transcoder, reporter: &'a dyn ProgressReporter, audio_ext: &'a str) -> Self {
        Self {
            transcoder,
            reporter,
            audio_ext,
        }
    }

    /// Destination file for `chapter` inside `output_dir`
    pub fn destination(&self, chapter: &Chapter, index: usize, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}.{}", chapter_file_stem(&chapter.title, index), self.audio_ext))
    }

    /// Extract one chapter into `destination`, skipping it when the file already exists
    pub async fn extract(
        &self,
        container: &Path,
        chapter: &Chapter,
        index: usize,
        destination: &Path,
    ) -> Result<ChapterStatus> {
        let span = tracing::info_span!("chapter", index = index + 1);
        self.extract_inner(container, chapter, index, destination)
            .instrument(span)
            .await
    }

    async fn extract_inner(
        &self,
        container: &Path,
        chapter: &Chapter,
        index: usize,
        destination: &Path,
    ) -> Result<ChapterStatus> {
        chapter
            .validate()
            .map_err(|reason| ExtractorError::InvalidChapter { index: index + 1, reason })?;

        if tokio::fs::try_exists(destination).await? {
            tracing::info!(
                "Output file {} already exists, skipping",
                destination.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
            );
            return Ok(ChapterStatus::Skipped);
        }

        let job = TranscodeJob::slice(container, destination, chapter.start_time, chapter.duration());
        let progress = self.reporter.stage(&format!("Extraction du chapitre {}", index + 1));

        match self.transcoder.transcode(&job, progress).await {
            Ok(()) => {
                tracing::info!("Chapter {} ({}) extracted", index + 1, chapter.title);
                Ok(ChapterStatus::Extracted)
            }
            Err(e) => {
                tracing::error!("Chapter {} extraction failed: {:#}", index + 1, e);
                Err(e)
            }
        }
    }
}
