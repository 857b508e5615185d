use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ExtractorError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory; each video gets a subdirectory named after its title
    pub output_dir: PathBuf,

    /// yt-dlp settings
    pub download: DownloadConfig,

    /// ffmpeg output settings, shared by full-audio and chapter extraction
    pub audio: AudioConfig,

    /// Interactive prompt settings
    pub prompt: PromptConfig,

    /// Chapter extraction settings
    pub chapters: ChapterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// yt-dlp executable
    pub yt_dlp_path: String,

    /// Format selector passed to `--format`
    pub format: String,

    /// Extension of the downloaded container; yt-dlp merges into it
    pub container_ext: String,

    /// Pass `--no-check-certificates`
    pub no_check_certificates: bool,

    /// Extra `--add-header` values, `name:value`
    pub headers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// ffmpeg executable
    pub ffmpeg_path: String,

    /// Encoder passed to `-acodec`
    pub codec: String,

    /// Bitrate passed to `-b:a`
    pub bitrate: String,

    /// Output extension, also used as the ffmpeg muxer name
    pub extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Answer that continues the loop, compared case-insensitively
    pub affirmative: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterConfig {
    pub on_failure: ChapterFailurePolicy,
}

/// What the orchestrator does after a chapter fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChapterFailurePolicy {
    /// Record the failure and move on to the next chapter
    #[default]
    Continue,
    /// Stop the chapter loop and fail the video
    Abort,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            download: DownloadConfig::default(),
            audio: AudioConfig::default(),
            prompt: PromptConfig::default(),
            chapters: ChapterConfig::default(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            format: "bestvideo[height<=1080]+bestaudio/best[height<=1080]".to_string(),
            container_ext: "mkv".to_string(),
            no_check_certificates: true,
            headers: vec![
                "referer:youtube.com".to_string(),
                "user-agent:googlebot".to_string(),
            ],
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            codec: "libmp3lame".to_string(),
            bitrate: "192k".to_string(),
            extension: "mp3".to_string(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            affirmative: "oui".to_string(),
        }
    }
}

impl Default for ChapterConfig {
    fn default() -> Self {
        Self {
            on_failure: ChapterFailurePolicy::Continue,
        }
    }
}

impl Config {
    /// Load configuration from `explicit`, or from the default lookup path
    ///
    /// A missing file at the default location yields the defaults; an explicit
    /// path must exist.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ExtractorError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    ))
                    .into());
                }
                Some(path.to_path_buf())
            }
            None => Self::config_path().filter(|path| path.exists()),
        };

        let Some(config_path) = config_path else {
            tracing::debug!("No config file found, using defaults");
            return Ok(Self::default());
        };

        let content = fs_err::read_to_string(&config_path)
            .context("Failed to read config file")?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;

        tracing::debug!("Loaded configuration from {}", config_path.display());
        Ok(config)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get configuration file path
    pub fn config_path() -> Option<PathBuf> {
        // ./config.yaml takes precedence
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir().map(|dir| dir.join("chapter-extractor").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.download.yt_dlp_path.trim().is_empty(), "download.yt_dlp_path must not be empty"),
            (self.download.format.trim().is_empty(), "download.format must not be empty"),
            (self.download.container_ext.trim().is_empty(), "download.container_ext must not be empty"),
            (self.audio.ffmpeg_path.trim().is_empty(), "audio.ffmpeg_path must not be empty"),
            (self.audio.extension.trim().is_empty(), "audio.extension must not be empty"),
            (self.prompt.affirmative.trim().is_empty(), "prompt.affirmative must not be empty"),
        ];

        if let Some((_, message)) = checks.iter().find(|(failed, _)| *failed) {
            return Err(ExtractorError::Config(message.to_string()).into());
        }

        Ok(())
    }

    /// Default configuration as YAML, a starting point for a config file
    pub fn template() -> Result<String> {
        serde_yaml::to_string(&Self::default()).context("Failed to serialize config")
    }

    /// Display current configuration, loaded from `source`
    pub fn display(&self, source: Option<&Path>) {
        match source {
            Some(path) => println!("Configuration file: {}", path.display()),
            None => println!("Configuration file: (defaults)"),
        }
        println!("Current Configuration:");
        println!("  Output Directory: {}", self.output_dir.display());
        println!("  yt-dlp: {}", self.download.yt_dlp_path);
        println!("  Format: {}", self.download.format);
        println!("  Container: .{}", self.download.container_ext);
        println!("  ffmpeg: {}", self.audio.ffmpeg_path);
        println!(
            "  Audio: {} @ {} (.{})",
            self.audio.codec, self.audio.bitrate, self.audio.extension
        );
        println!("  Continue Token: {}", self.prompt.affirmative);
        println!("  On Chapter Failure: {:?}", self.chapters.on_failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_1080p_and_192k_mp3() {
        let config = Config::default();
        assert_eq!(config.output_dir, PathBuf::from("./output"));
        assert_eq!(config.audio.codec, "libmp3lame");
        assert_eq!(config.audio.bitrate, "192k");
        assert_eq!(config.prompt.affirmative, "oui");
        assert!(config.download.format.contains("height<=1080"));
        assert_eq!(config.chapters.on_failure, ChapterFailurePolicy::Continue);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("chapters:\n  on_failure: abort\naudio:\n  bitrate: 320k\n").unwrap();
        assert_eq!(config.chapters.on_failure, ChapterFailurePolicy::Abort);
        assert_eq!(config.audio.bitrate, "320k");
        assert_eq!(config.audio.codec, "libmp3lame");
        assert_eq!(config.prompt.affirmative, "oui");
    }

    #[test]
    fn empty_affirmative_is_rejected() {
        let err = Config::from_yaml("prompt:\n  affirmative: \"  \"\n").unwrap_err();
        assert!(err.to_string().contains("prompt.affirmative"));
    }

    #[test]
    fn template_round_trips() {
        let template = Config::template().unwrap();
        assert!(template.contains("affirmative: oui"));
        let parsed = Config::from_yaml(&template).unwrap();
        assert_eq!(parsed.audio.bitrate, "192k");
    }

    #[tokio::test]
    async fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(Config::load(Some(&missing)).await.is_err());
    }

    #[tokio::test]
    async fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs_err::write(&path, "output_dir: /srv/audio\n").unwrap();

        let config = Config::load(Some(&path)).await.unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/srv/audio"));
    }
}
