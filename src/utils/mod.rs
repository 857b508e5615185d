use anyhow::Result;
use url::Url;

use crate::ExtractorError;

/// Separator stripped from chapter titles before they become filenames
const TITLE_SEPARATOR: &str = " - ";

/// Validate a URL and return normalized version
pub fn validate_and_normalize_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(ExtractorError::InvalidUrl("empty input".to_string()).into());
    }

    let parsed = Url::parse(trimmed)
        .map_err(|_| ExtractorError::InvalidUrl(trimmed.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ExtractorError::InvalidUrl(format!(
            "{} (URL must use HTTP or HTTPS protocol)",
            trimmed
        ))
        .into());
    }

    Ok(parsed.to_string())
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Sanitize filename for safe filesystem usage
///
/// Characters that are reserved on common filesystems and control characters
/// become `_`; surrounding whitespace and trailing dots are dropped. Returns an
/// empty string when nothing usable is left.
pub fn sanitize_filename(filename: &str) -> String {
    let replaced: String = filename
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    replaced.trim().trim_end_matches('.').trim_end().to_string()
}

/// Filename stem for a chapter: drops the first `" - "` then sanitizes
pub fn chapter_file_stem(title: &str, index: usize) -> String {
    let stripped = title.replacen(TITLE_SEPARATOR, "", 1);
    let stem = sanitize_filename(&stripped);
    if stem.is_empty() {
        format!("chapter-{}", index + 1)
    } else {
        stem
    }
}

/// Directory and file stem for a video, falling back to its id
pub fn video_file_stem(title: &str, id: &str) -> String {
    let stem = sanitize_filename(title);
    if !stem.is_empty() {
        return stem;
    }

    let id_stem = sanitize_filename(id);
    if id_stem.is_empty() {
        "video".to_string()
    } else {
        id_stem
    }
}

/// Check if the current environment has required tools
pub async fn check_dependencies(yt_dlp: &str, ffmpeg: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(yt_dlp, "--version").await {
        missing.push(format!("{} - required for metadata and downloads", yt_dlp));
    }

    if !check_command_available(ffmpeg, "-version").await {
        missing.push(format!("{} - required for audio extraction", ffmpeg));
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str, version_flag: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg(version_flag)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
