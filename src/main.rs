use std::path::PathBuf;

use clap::Parser;

use gr_event_scrape::pipeline::{self, RunOptions};
use gr_event_scrape::utils;

#[derive(Parser)]
#[command(name = "gr-event-scrape", about = "Scrape Grand Rapids business events into one dataset")]
struct Cli {
    /// Bypass the 24-hour minimum interval between runs
    #[arg(long)]
    force: bool,
    /// Directory for the dataset and geocode cache (defaults to the platform data dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let data_root = cli.data_dir.unwrap_or_else(utils::data_root);
    let options = RunOptions {
        force: cli.force,
        data_file: data_root.join("events.json"),
        cache_file: data_root.join("geocache.json"),
    };

    pipeline::run(&options)?;
    Ok(())
}
