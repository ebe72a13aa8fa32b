//! Cleanup binary: delete stale files from the uploads root.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tryon_cli::{cleanup, init_tracing};

#[derive(Parser)]
#[command(name = "tryon-cleanup", about = "Delete stale files from the uploads root")]
struct Cli {
    /// Uploads root to sweep (top level plus thumbnails/ and results/)
    #[arg(long, default_value = "uploads")]
    root: PathBuf,

    /// Delete files at least this old
    #[arg(long, default_value = "24")]
    max_age_hours: u64,

    /// Report what would be deleted without deleting anything
    #[arg(long)]
    dry_run: bool,

    /// Glob pattern of file names to keep (repeatable)
    #[arg(long)]
    exclude: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let report = cleanup(
        &cli.root,
        Duration::from_secs(cli.max_age_hours * 3600),
        &cli.exclude,
        cli.dry_run,
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
