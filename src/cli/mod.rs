use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "chapter-extractor",
    about = "Chapter Extractor - Download a video and split its audio by chapter",
    version,
    long_about = "An interactive CLI tool that downloads a video with yt-dlp, extracts the full audio track and one MP3 per chapter with ffmpeg. Run without a subcommand to be prompted for URLs."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress bars
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Root directory for extracted files (overrides the config file)
    #[arg(short, long, global = true, value_name = "DIR", env = "CHAPTER_EXTRACTOR_OUTPUT")]
    pub output_dir: Option<PathBuf>,

    /// Path to a configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a config template, or the effective configuration with --show
    Config {
        /// Print the effective settings instead of a template
        #[arg(short, long)]
        show: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_means_interactive() {
        let cli = Cli::try_parse_from(["chapter-extractor"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(cli.output_dir.is_none());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["chapter-extractor", "config", "--show", "-o", "/tmp/out"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Config { show: true })));
        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn rejects_positional_url() {
        assert!(Cli::try_parse_from(["chapter-extractor", "https://youtu.be/x"]).is_err());
    }
}
