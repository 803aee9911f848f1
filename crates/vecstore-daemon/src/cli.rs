//! CLI argument parsing for the vecstore binary.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};

use vecstore_client::DEFAULT_ENDPOINT;

/// Vecstore
///
/// An HTTP service storing embedding vectors with JSON metadata and
/// answering nearest-neighbor queries.
#[derive(Parser, Debug)]
#[command(name = "vecstore")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/vecstore/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP service
    Start {
        /// Run in foreground (don't daemonize)
        #[arg(short, long)]
        foreground: bool,

        /// Override listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override listen host
        #[arg(long)]
        host: Option<String>,

        /// Override data directory
        #[arg(long)]
        data_dir: Option<String>,
    },

    /// Stop the running service
    Stop,

    /// Show whether the service is running
    Status,

    /// Print the merged configuration as TOML
    Config,

    /// Summarize the persisted store without starting the server
    Inspect {
        /// Data directory (defaults to the configured one)
        #[arg(long)]
        data_dir: Option<String>,
    },

    /// Talk to a running service
    Client {
        /// Service endpoint
        #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
        endpoint: String,

        #[command(subcommand)]
        command: ClientCommands,
    },
}

/// Client subcommands
#[derive(Subcommand, Debug)]
pub enum ClientCommands {
    /// GET /health
    Health,

    /// GET /status
    Info,

    /// Store one vector
    Add {
        /// External identifier
        id: String,

        /// Vector as a JSON array, e.g. '[0.1, 0.2]'
        vector: String,

        /// Metadata as a JSON object
        #[arg(short, long)]
        metadata: Option<String>,
    },

    /// Nearest-neighbor search
    Search {
        /// Query vector as a JSON array
        vector: String,

        /// Number of results
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Add every record from a JSON Lines file of `{id, vector, metadata}`
    Import {
        /// Path to the .jsonl file
        file: String,
    },
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
