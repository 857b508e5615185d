use anyhow::Context;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod chapters;

pub use chapters::{ChapterExtractor, ChapterOutcome, ChapterStatus};

use crate::config::{ChapterFailurePolicy, Config};
use crate::fetch::{MediaFetcher, VideoMetadata, YtDlpFetcher};
use crate::progress::ProgressReporter;
use crate::transcode::{FfmpegTranscoder, TranscodeJob, Transcoder};
use crate::utils::{format_duration, validate_and_normalize_url, video_file_stem};
use crate::Result;

/// Where a video's files live on disk
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayout {
    /// `<root>/<title>`
    pub dir: PathBuf,
    /// Downloaded container, `<dir>/<title>.<container_ext>`
    pub container: PathBuf,
    /// Full audio track, `<dir>/<title>.<audio_ext>`
    pub full_audio: PathBuf,
}

impl OutputLayout {
    pub fn new(root: &Path, metadata: &VideoMetadata, container_ext: &str, audio_ext: &str) -> Self {
        let stem = video_file_stem(&metadata.title, &metadata.id);
        let dir = root.join(&stem);
        Self {
            container: dir.join(format!("{}.{}", stem, container_ext)),
            full_audio: dir.join(format!("{}.{}", stem, audio_ext)),
            dir,
        }
    }
}

/// Summary of one processed video
#[derive(Debug, Clone)]
pub struct VideoReport {
    pub metadata: VideoMetadata,
    pub layout: OutputLayout,
    pub chapters: Vec<ChapterOutcome>,
}

impl VideoReport {
    fn count(&self, pred: impl Fn(&ChapterStatus) -> bool) -> usize {
        self.chapters.iter().filter(|c| pred(&c.status)).count()
    }

    pub fn extracted(&self) -> usize {
        self.count(|s| matches!(s, ChapterStatus::Extracted))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ChapterStatus::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ChapterStatus::Failed(_)))
    }
}

/// Settings the pipeline needs from [`Config`]
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub output_root: PathBuf,
    pub container_ext: String,
    pub audio_ext: String,
    pub on_failure: ChapterFailurePolicy,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            output_root: config.output_dir.clone(),
            container_ext: config.download.container_ext.clone(),
            audio_ext: config.audio.extension.clone(),
            on_failure: config.chapters.on_failure,
        }
    }
}

/// Per-video pipeline: metadata, download, full audio, chapters
pub struct VideoPipeline {
    fetcher: Arc<dyn MediaFetcher>,
    transcoder: Arc<dyn Transcoder>,
    reporter: Arc<dyn ProgressReporter>,
    settings: PipelineSettings,
}

impl VideoPipeline {
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        transcoder: Arc<dyn Transcoder>,
        reporter: Arc<dyn ProgressReporter>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            fetcher,
            transcoder,
            reporter,
            settings,
        }
    }

    /// Pipeline backed by yt-dlp and ffmpeg
    pub fn from_config(config: &Config, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self::new(
            Arc::new(YtDlpFetcher::new(config.download.clone())),
            Arc::new(FfmpegTranscoder::new(config.audio.clone())),
            reporter,
            PipelineSettings::from(config),
        )
    }

    /// Run every stage for `url`
    ///
    /// Stages run strictly in order. Partial files are left in place when a
    /// stage fails.
    #[tracing::instrument(name = "video", skip(self, url), fields(url = %url.trim()))]
    pub async fn process(&self, url: &str) -> Result<VideoReport> {
        let url = validate_and_normalize_url(url)?;

        tracing::info!("Fetching video information from: {}", url);
        let metadata = self.fetcher.fetch_metadata(&url).await?;
        tracing::info!(
            "Video information retrieved, ID: {} ({}, {} chapters)",
            metadata.id,
            metadata.duration.map(format_duration).unwrap_or_else(|| "unknown length".to_string()),
            metadata.chapters.len()
        );

        let layout = OutputLayout::new(
            &self.settings.output_root,
            &metadata,
            &self.settings.container_ext,
            &self.settings.audio_ext,
        );
        self.ensure_output_dir(&layout.dir).await?;

        let progress = self.reporter.stage("Téléchargement");
        self.fetcher.download(&url, &layout.container, progress).await?;
        tracing::info!("Video downloaded as: {}", layout.container.display());

        self.extract_full_audio(&layout, metadata.duration).await?;

        let chapters = self.extract_chapters(&layout, &metadata).await?;

        let report = VideoReport {
            metadata,
            layout,
            chapters,
        };
        if !report.chapters.is_empty() {
            tracing::info!(
                "Chapters: {} extracted, {} skipped, {} failed",
                report.extracted(),
                report.skipped(),
                report.failed()
            );
        }

        Ok(report)
    }

    async fn ensure_output_dir(&self, dir: &Path) -> Result<()> {
        if tokio::fs::try_exists(dir).await? {
            return Ok(());
        }

        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        tracing::info!("Created output directory: {}", dir.display());
        Ok(())
    }

    async fn extract_full_audio(&self, layout: &OutputLayout, duration: Option<f64>) -> Result<()> {
        tracing::info!("Extracting full audio");

        let job = TranscodeJob::full(&layout.container, &layout.full_audio, duration);
        let progress = self.reporter.stage("Extraction de l'audio complet");

        match self.transcoder.transcode(&job, progress).await {
            Ok(()) => {
                tracing::info!("Full audio extracted: {}", layout.full_audio.display());
                Ok(())
            }
            Err(e) => {
                tracing::error!("Full audio extraction failed: {:#}", e);
                Err(e)
            }
        }
    }

    /// Extract chapters one after another, applying the failure policy
    async fn extract_chapters(&self, layout: &OutputLayout, metadata: &VideoMetadata) -> Result<Vec<ChapterOutcome>> {
        if metadata.chapters.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!("Chapters to extract: {}", metadata.chapters.len());

        let extractor = ChapterExtractor::new(
            self.transcoder.as_ref(),
            self.reporter.as_ref(),
            &self.settings.audio_ext,
        );

        // Chapter files never overwrite the video's own files or each other
        let mut claimed = HashSet::from([layout.container.clone(), layout.full_audio.clone()]);

        let mut outcomes = Vec::with_capacity(metadata.chapters.len());
        for (index, chapter) in metadata.chapters.iter().enumerate() {
            let path = claim_path(extractor.destination(chapter, index, &layout.dir), index, &mut claimed);
            let status = match extractor.extract(&layout.container, chapter, index, &path).await {
                Ok(status) => status,
                Err(e) if self.settings.on_failure == ChapterFailurePolicy::Abort => {
                    return Err(e.context(format!("Chapter {} failed, remaining chapters aborted", index + 1)));
                }
                Err(e) => {
                    tracing::warn!("Continuing after chapter {} failure", index + 1);
                    ChapterStatus::Failed(format!("{:#}", e))
                }
            };

            outcomes.push(ChapterOutcome {
                index,
                title: chapter.title.clone(),
                path,
                status,
            });
        }

        Ok(outcomes)
    }
}

/// Reserve `path`, suffixing the stem with `-<n>` while it is already taken
///
/// Numbering starts at the chapter's 1-based position so reruns pick the same names.
fn claim_path(path: PathBuf, index: usize, claimed: &mut HashSet<PathBuf>) -> PathBuf {
    let mut candidate = path.clone();
    let mut n = index + 1;

    while claimed.contains(&candidate) {
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        candidate = path.with_file_name(format!("{}-{}{}", stem, n, ext));
        n += 1;
    }

    if candidate != path {
        tracing::debug!("{} is taken, writing {} instead", path.display(), candidate.display());
    }
    claimed.insert(candidate.clone());
    candidate
}
