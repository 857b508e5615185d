use anyhow::{anyhow, Context};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use super::{MediaFetcher, VideoMetadata};
use crate::config::DownloadConfig;
use crate::progress::ProgressSink;
use crate::{ExtractorError, Result};

/// Marker opening each progress line yt-dlp prints for us
const PROGRESS_MARKER: &str = "PROGRESS|";

/// `download:` selects the progress type and is not printed; lines come out as
/// `PROGRESS|  12.3%`
const PROGRESS_TEMPLATE: &str = "download:PROGRESS|%(progress._percent_str)s";

/// Metadata and media retrieval through yt-dlp
pub struct YtDlpFetcher {
    config: DownloadConfig,
}

impl YtDlpFetcher {
    pub fn new(config: DownloadConfig) -> Self {
        Self { config }
    }

    /// Arguments shared by metadata and download calls
    fn access_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.config.no_check_certificates {
            args.push("--no-check-certificates".to_string());
        }
        for header in &self.config.headers {
            args.push("--add-header".to_string());
            args.push(header.clone());
        }
        args
    }

    fn metadata_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            "--prefer-free-formats".to_string(),
        ];
        args.extend(self.access_args());
        args.push(url.to_string());
        args
    }

    fn download_args(&self, url: &str, output: &Path) -> Vec<String> {
        let mut args = vec![
            "--format".to_string(),
            self.config.format.clone(),
            "--merge-output-format".to_string(),
            self.config.container_ext.clone(),
            "--output".to_string(),
            output.to_string_lossy().into_owned(),
            "--force-overwrites".to_string(),
            "--no-playlist".to_string(),
            "--no-part".to_string(),
            "--newline".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
        ];
        args.extend(self.access_args());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata> {
        tracing::debug!("Extracting video info for: {}", url);

        let output = Command::new(&self.config.yt_dlp_path)
            .args(self.metadata_args(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.config.yt_dlp_path))
            .map_err(|e| ExtractorError::MetadataFetch(format!("{:#}", e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractorError::MetadataFetch(format!("yt-dlp failed: {}", error.trim())).into());
        }

        let metadata: VideoMetadata = serde_json::from_slice(&output.stdout)
            .map_err(|e| ExtractorError::MetadataFetch(format!("unexpected yt-dlp output: {}", e)))?;

        Ok(metadata)
    }

    async fn download(&self, url: &str, output: &Path, progress: Box<dyn ProgressSink>) -> Result<()> {
        tracing::debug!("Downloading {} to {}", url, output.display());

        let mut child = Command::new(&self.config.yt_dlp_path)
            .args(self.download_args(url, output))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExtractorError::Download(format!("Failed to start yt-dlp: {}", e)))?;

        let stdout = child.stdout.take().ok_or_else(|| anyhow!("No stdout"))?;
        let mut stderr = child.stderr.take().ok_or_else(|| anyhow!("No stderr"))?;

        // Read stderr on its own task so the pipe never fills
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(percent) = parse_progress_line(&line) {
                progress.percent(percent);
            } else if !line.trim().is_empty() {
                tracing::trace!("yt-dlp: {}", line);
            }
        }

        let status = child.wait().await?;
        let stderr_output = stderr_task.await.unwrap_or_default();

        if !status.success() {
            progress.fail();
            return Err(ExtractorError::Download(format!(
                "yt-dlp exited with {}: {}",
                status,
                stderr_output.trim()
            ))
            .into());
        }

        progress.finish();
        Ok(())
    }
}

/// Parse a `PROGRESS|  45.2%` line printed through [`PROGRESS_TEMPLATE`]
pub fn parse_progress_line(line: &str) -> Option<f64> {
    let rest = line.trim().strip_prefix(PROGRESS_MARKER)?;
    rest.trim().trim_end_matches('%').trim().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parse_progress_with_padding() {
        assert_eq!(parse_progress_line("PROGRESS|  45.2%"), Some(45.2));
        assert_eq!(parse_progress_line("PROGRESS|100.0%"), Some(100.0));
    }

    #[test]
    fn parse_progress_ignores_other_output() {
        assert_eq!(parse_progress_line("[info] Downloading webpage"), None);
        assert_eq!(parse_progress_line("[download] Destination: Talk.f137.mp4"), None);
        assert_eq!(parse_progress_line("PROGRESS|   N/A%"), None);
        assert_eq!(parse_progress_line(""), None);
    }

    #[test]
    fn template_output_matches_parser() {
        // yt-dlp consumes everything up to the first ':' as the progress type
        let (kind, printed) = PROGRESS_TEMPLATE.split_once(':').unwrap();
        assert_eq!(kind, "download");

        let line = printed.replace("%(progress._percent_str)s", "  45.2%");
        assert_eq!(line, "PROGRESS|  45.2%");
        assert_eq!(parse_progress_line(&line), Some(45.2));
    }

    #[test]
    fn metadata_args_spoof_access() {
        let fetcher = YtDlpFetcher::new(DownloadConfig::default());
        let args = fetcher.metadata_args("https://youtu.be/abc");

        assert_eq!(args[0], "--dump-single-json");
        assert!(args.contains(&"--no-check-certificates".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "--add-header" && w[1] == "referer:youtube.com"));
        assert!(args.windows(2).any(|w| w[0] == "--add-header" && w[1] == "user-agent:googlebot"));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/abc"));
    }

    #[test]
    fn download_args_cap_resolution_and_target_path() {
        let fetcher = YtDlpFetcher::new(DownloadConfig::default());
        let target = PathBuf::from("output/Talk/Talk.mkv");
        let args = fetcher.download_args("https://youtu.be/abc", &target);

        assert!(args
            .windows(2)
            .any(|w| w[0] == "--format" && w[1] == "bestvideo[height<=1080]+bestaudio/best[height<=1080]"));
        assert!(args.windows(2).any(|w| w[0] == "--output" && w[1] == "output/Talk/Talk.mkv"));
        assert!(args.contains(&"--force-overwrites".to_string()));
    }

    #[test]
    fn certificate_checks_can_be_kept() {
        let config = DownloadConfig {
            no_check_certificates: false,
            headers: Vec::new(),
            ..DownloadConfig::default()
        };
        let args = YtDlpFetcher::new(config).metadata_args("https://youtu.be/abc");
        assert!(!args.contains(&"--no-check-certificates".to_string()));
        assert!(!args.contains(&"--add-header".to_string()));
    }
}
