//! gitsync command-line library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (sync, search, init-index, config)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, SearchArgs, SyncArgs, TargetArg};
pub use commands::{
    build_request, format_report, format_results, init_logging, load_settings, run_init_index,
    run_search, run_sync, show_config, sync_repository,
};
