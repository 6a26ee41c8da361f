//! gitsync
//!
//! Keeps a search index in step with a git repository.
//!
//! # Usage
//!
//! ```bash
//! gitsync sync [--repo PATH] [--from REV] [--to REV] [--dry-run]
//! gitsync search QUERY [--target blobs|commits|both] [--language L]
//! gitsync init-index [--force]
//! gitsync config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/gitsync/config.toml)
//! 3. Environment variables (GITSYNC__*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use gitsync_cli::{
    init_logging, load_settings, run_init_index, run_search, run_sync, show_config, Cli,
    Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
    init_logging(&settings.log_level)?;

    match cli.command {
        Commands::Sync(args) => {
            run_sync(&settings, args).await?;
        }
        Commands::Search(args) => {
            run_search(&settings, args).await?;
        }
        Commands::InitIndex { force } => {
            run_init_index(&settings, force).await?;
        }
        Commands::Config => {
            show_config(&settings)?;
        }
    }

    Ok(())
}
