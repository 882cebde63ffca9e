use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod runner;

use runner::AppConfig;

#[derive(Parser)]
#[command(author, version, about = "Route trains to their stations by switching gates", long_about = None)]
struct Args {
    /// JSON file with `bot` and `detection` sections
    #[arg(long)]
    config: Option<PathBuf>,
    /// Screenshot used as the game window
    #[arg(long)]
    frame: PathBuf,
    /// Session length in seconds
    #[arg(long)]
    duration: Option<u64>,
    #[arg(long)]
    max_frames: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("switchyard=info,switchyard_core=info,switchyard_cv=info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(duration) = args.duration {
        config.bot.session.duration_secs = duration;
    }
    if args.max_frames.is_some() {
        config.bot.session.max_frames = args.max_frames;
    }

    let summary = runner::play(args.frame, &config)?;
    info!(
        "Done: {} frames, {} actuations",
        summary.frames, summary.actuations
    );
    Ok(())
}
