use anyhow::anyhow;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use super::{TranscodeJob, Transcoder};
use crate::config::AudioConfig;
use crate::progress::ProgressSink;
use crate::{ExtractorError, Result};

/// Audio transcoding through an ffmpeg subprocess
pub struct FfmpegTranscoder {
    config: AudioConfig,
}

impl FfmpegTranscoder {
    pub fn new(config: AudioConfig) -> Self {
        Self { config }
    }

    fn args(&self, job: &TranscodeJob) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
        ];

        if let Some(range) = job.range {
            // -ss before -i seeks the input
            args.push("-ss".to_string());
            args.push(format_seconds(range.start));
        }

        args.push("-i".to_string());
        args.push(job.input.to_string_lossy().into_owned());

        if let Some(range) = job.range {
            args.push("-t".to_string());
            args.push(format_seconds(range.duration));
        }

        args.extend([
            "-vn".to_string(),
            "-acodec".to_string(),
            self.config.codec.clone(),
            "-b:a".to_string(),
            self.config.bitrate.clone(),
            "-f".to_string(),
            self.config.extension.clone(),
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-nostats".to_string(),
            job.output.to_string_lossy().into_owned(),
        ]);

        args
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, job: &TranscodeJob, progress: Box<dyn ProgressSink>) -> Result<()> {
        tracing::debug!(
            "Transcoding {} -> {}",
            job.input.display(),
            job.output.display()
        );

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(self.args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExtractorError::Transcode(format!("Failed to start ffmpeg: {}", e)))?;

        let stdout = child.stdout.take().ok_or_else(|| anyhow!("No stdout"))?;
        let mut stderr = child.stderr.take().ok_or_else(|| anyhow!("No stderr"))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(elapsed) = parse_out_time(&line) {
                if let Some(total) = job.expected_duration.filter(|total| *total > 0.0) {
                    progress.percent((elapsed / total * 100.0).min(100.0));
                }
            }
        }

        let status = child.wait().await?;
        let stderr_output = stderr_task.await.unwrap_or_default();

        if !status.success() {
            progress.fail();
            return Err(ExtractorError::Transcode(format!(
                "ffmpeg exited with {} for {}: {}",
                status,
                job.output.display(),
                stderr_output.trim()
            ))
            .into());
        }

        progress.finish();
        Ok(())
    }
}

/// Elapsed output time in seconds from an `-progress` key/value line
///
/// Both `out_time_us` and `out_time_ms` carry microseconds.
pub fn parse_out_time(line: &str) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_us" | "out_time_ms" => value
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|us| *us >= 0)
            .map(|us| us as f64 / 1_000_000.0),
        _ => None,
    }
}

/// Seconds with millisecond precision, as ffmpeg accepts for `-ss`/`-t`
fn format_seconds(seconds: f64) -> String {
    format!("{:.3}", seconds)
}
