use anyhow::Result;
use clap::Parser;
use console::style;
use std::sync::Arc;
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chapter_extractor::cli::{Cli, Commands};
use chapter_extractor::config::Config;
use chapter_extractor::pipeline::VideoPipeline;
use chapter_extractor::progress::{ProgressReporter, SilentReporter, TerminalReporter};
use chapter_extractor::prompt::{self, Prompter};
use chapter_extractor::utils;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "chapter_extractor=debug"
    } else {
        "chapter_extractor=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load(cli.config.as_deref()).await?;
    if let Some(dir) = cli.output_dir.clone() {
        config.output_dir = dir;
    }

    match cli.command {
        Some(Commands::Config { show }) => {
            if show {
                let source = cli
                    .config
                    .clone()
                    .or_else(|| Config::config_path().filter(|path| path.exists()));
                config.display(source.as_deref());
            } else {
                println!("# Save as config.yaml or pass with --config");
                print!("{}", Config::template()?);
            }
            Ok(())
        }
        None => {
            let span = tracing::info_span!("YoutubeChapterExtractor");
            run_interactive(config, cli.quiet).instrument(span).await
        }
    }
}

async fn run_interactive(config: Config, quiet: bool) -> Result<()> {
    // Check for required external dependencies (non-fatal)
    let missing_deps =
        utils::check_dependencies(&config.download.yt_dlp_path, &config.audio.ffmpeg_path).await;
    if !missing_deps.is_empty() {
        eprintln!("{}", style("⚠️  Dependency check warnings:").yellow());
        for dep in missing_deps {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - tools may be available)");
    }

    let reporter: Arc<dyn ProgressReporter> = if quiet {
        Arc::new(SilentReporter)
    } else {
        Arc::new(TerminalReporter::new())
    };
    let pipeline = VideoPipeline::from_config(&config, reporter);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut prompter = Prompter::new(stdin, tokio::io::stdout(), config.prompt.affirmative.clone());

    let pipeline = &pipeline;
    let handled = prompt::run_loop(&mut prompter, |url| async move {
        pipeline.process(&url).await.map(|_| ())
    })
    .await?;

    tracing::info!("Done, {} video(s) processed", handled);
    Ok(())
}
