//! Vecstore daemon library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (start, stop, status, config, inspect, client)

pub mod cli;
pub mod commands;

pub use cli::{Cli, ClientCommands, Commands};
pub use commands::{
    handle_client, import_file, inspect_store, show_config, show_status, start_daemon,
    stop_daemon, summarize_store, ImportStats, StartOverrides, StoreSummary,
};
