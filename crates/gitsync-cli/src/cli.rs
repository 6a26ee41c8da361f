//! CLI argument parsing for gitsync.
//!
//! CLI flags override every other configuration source.

use clap::{Args, Parser, Subcommand, ValueEnum};

use gitsync_types::{SearchOrder, SearchTarget};

/// Keep a search index in step with a git repository
#[derive(Parser, Debug)]
#[command(name = "gitsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/gitsync/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index the changes between two revisions
    Sync(SyncArgs),

    /// Search indexed blobs and commits
    Search(SearchArgs),

    /// Create the index with its mappings
    InitIndex {
        /// Drop and recreate an existing index
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Repository path (overrides repository.path)
    #[arg(long)]
    pub repo: Option<String>,

    /// Repository id used to scope documents (overrides repository.id)
    #[arg(long)]
    pub repo_id: Option<String>,

    /// Last synchronized revision; all zeros for a new branch
    #[arg(long)]
    pub from: Option<String>,

    /// Target revision (default: HEAD); all zeros for a deleted ref
    #[arg(long)]
    pub to: Option<String>,

    /// Index blobs only
    #[arg(long, conflicts_with = "commits_only")]
    pub blobs_only: bool,

    /// Index commits only
    #[arg(long)]
    pub commits_only: bool,

    /// Write to an in-memory store instead of the configured one
    #[arg(long)]
    pub dry_run: bool,
}

/// Which documents a search covers.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TargetArg {
    Blobs,
    Commits,
    #[default]
    Both,
}

impl From<TargetArg> for SearchTarget {
    fn from(target: TargetArg) -> Self {
        match target {
            TargetArg::Blobs => SearchTarget::Blobs,
            TargetArg::Commits => SearchTarget::Commits,
            TargetArg::Both => SearchTarget::Both,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Free-text query; empty matches everything
    #[arg(default_value = "")]
    pub query: String,

    #[arg(short, long, value_enum, default_value_t = TargetArg::Both)]
    pub target: TargetArg,

    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Results per page (default from search.per_page)
    #[arg(long)]
    pub per_page: Option<u32>,

    /// Restrict to a repository id (repeatable)
    #[arg(long = "repo-id")]
    pub repository_ids: Vec<String>,

    /// Restrict blobs to a language (repeatable)
    #[arg(long = "language")]
    pub languages: Vec<String>,

    /// default, recently-indexed or last-indexed
    #[arg(long, default_value = "default")]
    pub order: SearchOrder,

    /// Highlight matches
    #[arg(long)]
    pub highlight: bool,

    /// Marker before a highlighted span
    #[arg(long, default_value = "<em>")]
    pub pre_tag: String,

    /// Marker after a highlighted span
    #[arg(long, default_value = "</em>")]
    pub post_tag: String,

    /// Print the raw response as JSON
    #[arg(long)]
    pub json: bool,
}
