//! Vecstore
//!
//! HTTP vector store: add embeddings with metadata, query nearest neighbors.
//!
//! # Usage
//!
//! ```bash
//! vecstore start [--foreground] [--port PORT] [--host HOST] [--data-dir PATH]
//! vecstore stop
//! vecstore status
//! vecstore client search '[0.1, 0.2, ...]' -k 5
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/vecstore/config.toml)
//! 3. `PORT`, then environment variables (VECSTORE_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use vecstore_daemon::{
    handle_client, inspect_store, show_config, show_status, start_daemon, stop_daemon, Cli,
    Commands, StartOverrides,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            foreground,
            port,
            host,
            data_dir,
        } => {
            let overrides = StartOverrides {
                port,
                host,
                data_dir,
                log_level: cli.log_level,
            };
            start_daemon(cli.config.as_deref(), foreground, overrides).await?;
        }
        Commands::Stop => {
            stop_daemon()?;
        }
        Commands::Status => {
            show_status()?;
        }
        Commands::Config => {
            show_config(cli.config.as_deref())?;
        }
        Commands::Inspect { data_dir } => {
            inspect_store(cli.config.as_deref(), data_dir.as_deref())?;
        }
        Commands::Client { endpoint, command } => {
            handle_client(&endpoint, command).await?;
        }
    }

    Ok(())
}
