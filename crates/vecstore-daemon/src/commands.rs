//! Command implementations for the vecstore binary.
//!
//! Handles:
//! - start: Load config, open the store, serve HTTP
//! - stop: Signal the running service to stop (via PID file)
//! - status: Check if the service is running
//! - config / inspect: Offline views of settings and persisted state
//! - client: Requests against a running service

use std::fs;
use std::io::{BufRead, BufReader};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::signal;
use tracing::{info, warn};

use vecstore_client::VectorClient;
use vecstore_index::{EngineConfig, LoadError, Persistence, VectorStore};
use vecstore_service::run_server_with_shutdown;
use vecstore_types::{EngineKind, Metadata, Settings};

use crate::cli::ClientCommands;

/// Get the PID file path
fn pid_file_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| {
            #[cfg(unix)]
            {
                dirs.runtime_dir()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| dirs.cache_dir().to_path_buf())
            }
            #[cfg(not(unix))]
            {
                dirs.cache_dir().to_path_buf()
            }
        })
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("vecstore")
        .join("daemon.pid")
}

fn write_pid_file() -> Result<()> {
    let pid_path = pid_file_path();
    if let Some(parent) = pid_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&pid_path, std::process::id().to_string())?;
    info!("Wrote PID file: {:?}", pid_path);
    Ok(())
}

fn remove_pid_file() {
    let pid_path = pid_file_path();
    if pid_path.exists() {
        if let Err(e) = fs::remove_file(&pid_path) {
            warn!("Failed to remove PID file: {}", e);
        } else {
            info!("Removed PID file");
        }
    }
}

fn read_pid_file() -> Option<u32> {
    fs::read_to_string(pid_file_path())
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

#[cfg(unix)]
fn is_process_running(pid: u32) -> bool {
    // Signal 0 only checks that the process exists
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

#[cfg(not(unix))]
fn is_process_running(_pid: u32) -> bool {
    true
}

/// CLI overrides for `start`, applied on top of loaded settings.
#[derive(Debug, Default, Clone)]
pub struct StartOverrides {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub data_dir: Option<String>,
    pub log_level: Option<String>,
}

impl StartOverrides {
    /// CLI flags have the highest precedence.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(host) = &self.host {
            settings.host = host.clone();
        }
        if let Some(data_dir) = &self.data_dir {
            settings.data_dir = shellexpand::tilde(data_dir).into_owned();
        }
        if let Some(log_level) = &self.log_level {
            settings.log_level = log_level.clone();
        }
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

/// Start the vector store service.
///
/// 1. Load configuration (defaults -> file -> env -> CLI)
/// 2. Open the store, loading persisted state if present
/// 3. Serve HTTP
/// 4. Handle graceful shutdown on SIGINT/SIGTERM
pub async fn start_daemon(
    config_path: Option<&str>,
    foreground: bool,
    overrides: StartOverrides,
) -> Result<()> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    overrides.apply(&mut settings);

    init_tracing(&settings.log_level)?;

    info!("Vecstore starting...");
    info!("Configuration:");
    info!("  Data directory: {}", settings.data_dir);
    info!("  HTTP address: {}", settings.http_addr());
    info!("  Engine: {}", settings.engine);
    info!("  Dimension: {}", settings.dimension);
    info!("  Max elements: {}", settings.max_elements);
    info!("  Log level: {}", settings.log_level);

    if !foreground {
        warn!("Background mode not supported, running in foreground");
        warn!("Use a process manager (systemd, launchd) for background operation");
    }

    let data_dir = settings.expanded_data_dir();
    fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

    let store = VectorStore::from_settings(&settings).context("Failed to open vector store")?;
    let store = Arc::new(store);

    let addr: SocketAddr = settings
        .http_addr()
        .parse()
        .context("Invalid HTTP address")?;

    write_pid_file()?;

    let result = run_server_with_shutdown(addr, store.clone(), shutdown_signal()).await;

    // Every insert is already flushed; this covers a failed last flush.
    if let Err(e) = store.flush() {
        warn!("Final flush failed: {}", e);
    }

    remove_pid_file();

    result.map_err(|e| anyhow::anyhow!("Server error: {}", e))
}

/// Stop the running service by sending SIGTERM.
pub fn stop_daemon() -> Result<()> {
    let pid = read_pid_file().context("No PID file found - service may not be running")?;

    if !is_process_running(pid) {
        remove_pid_file();
        anyhow::bail!("Service not running (stale PID file removed)");
    }

    #[cfg(unix)]
    {
        unsafe {
            if libc::kill(pid as i32, libc::SIGTERM) != 0 {
                anyhow::bail!("Failed to send SIGTERM to service");
            }
        }
        println!("Sent SIGTERM to vecstore (PID {})", pid);
    }

    #[cfg(not(unix))]
    {
        anyhow::bail!("Stop command not supported on this platform");
    }

    Ok(())
}

/// Show service status.
pub fn show_status() -> Result<()> {
    let pid_path = pid_file_path();

    match read_pid_file() {
        Some(pid) if is_process_running(pid) => {
            println!("Vecstore is running (PID {})", pid);
            println!("PID file: {:?}", pid_path);
        }
        Some(pid) => {
            println!(
                "Vecstore is NOT running (stale PID {} in {:?})",
                pid, pid_path
            );
        }
        None => {
            println!("Vecstore is NOT running (no PID file)");
        }
    }
    Ok(())
}

/// Print the merged settings as TOML.
pub fn show_config(config_path: Option<&str>) -> Result<()> {
    let settings = Settings::load(config_path).context("Failed to load configuration")?;
    print!("{}", render_config(&settings)?);
    Ok(())
}

fn render_config(settings: &Settings) -> Result<String> {
    toml::to_string_pretty(settings).context("Failed to render configuration")
}

/// What a persisted store holds.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSummary {
    pub path: PathBuf,
    pub engine: EngineKind,
    pub dimension: usize,
    pub items: usize,
    pub capacity: usize,
    pub sample_ids: Vec<String>,
}

const SAMPLE_IDS: usize = 5;

/// Load the persisted store under `dir` read-only.
///
/// Returns `Ok(None)` when nothing is persisted. Unlike a server start, an
/// unreadable blob is reported and left where it is.
pub fn summarize_store(settings: &Settings, dir: &Path) -> Result<Option<StoreSummary>> {
    let persistence = Persistence::new(dir);
    let config = EngineConfig::from_settings(settings);

    let state = match persistence.load(&config) {
        Ok(state) => state,
        Err(LoadError::NotFound) => return Ok(None),
        Err(e) => {
            return Err(anyhow::anyhow!(
                "Failed to read {:?}: {}",
                persistence.index_path(),
                e
            ))
        }
    };

    Ok(Some(StoreSummary {
        path: persistence.index_path(),
        engine: state.engine.kind(),
        dimension: state.engine.dimension(),
        items: state.metadata.len(),
        capacity: state.engine.capacity(),
        sample_ids: state
            .metadata
            .iter()
            .take(SAMPLE_IDS)
            .map(|(_, record)| record.external_id.clone())
            .collect(),
    }))
}

/// `inspect`: summarize the persisted store without serving it.
pub fn inspect_store(config_path: Option<&str>, data_dir: Option<&str>) -> Result<()> {
    let settings = Settings::load(config_path).context("Failed to load configuration")?;
    let dir = match data_dir {
        Some(dir) => PathBuf::from(shellexpand::tilde(dir).into_owned()),
        None => settings.expanded_data_dir(),
    };

    match summarize_store(&settings, &dir)? {
        None => println!("No persisted store in {:?}", dir),
        Some(summary) => {
            println!("Store: {:?}", summary.path);
            println!("  Engine:    {}", summary.engine);
            println!("  Dimension: {}", summary.dimension);
            println!("  Items:     {}", summary.items);
            println!("  Capacity:  {}", summary.capacity);
            if !summary.sample_ids.is_empty() {
                println!("  First ids: {}", summary.sample_ids.join(", "));
            }
        }
    }
    Ok(())
}

/// Parse a vector given on the command line as a JSON array.
pub fn parse_vector_arg(raw: &str) -> Result<Vec<f32>> {
    let vector: Vec<f32> =
        serde_json::from_str(raw).context("Vector must be a JSON array of numbers")?;
    if vector.is_empty() {
        anyhow::bail!("Vector must not be empty");
    }
    Ok(vector)
}

/// Parse metadata given on the command line as a JSON object.
pub fn parse_metadata_arg(raw: Option<&str>) -> Result<Metadata> {
    match raw {
        None => Ok(Metadata::new()),
        Some(raw) => serde_json::from_str(raw).context("Metadata must be a JSON object"),
    }
}

/// One line of an import file.
#[derive(Debug, Deserialize)]
pub struct ImportRecord {
    pub id: String,
    pub vector: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Outcome of an import run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub added: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Parse JSON Lines into records. Blank lines are skipped; unparseable
/// lines are reported with their 1-based line number.
pub fn read_import_lines<R: BufRead>(reader: R) -> Vec<(usize, Result<ImportRecord>)> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let line_no = i + 1;
            match line {
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => Some((
                    line_no,
                    serde_json::from_str::<ImportRecord>(&line)
                        .with_context(|| format!("line {}: invalid record", line_no)),
                )),
                Err(e) => Some((
                    line_no,
                    Err(anyhow::Error::new(e).context(format!("line {}: read failed", line_no))),
                )),
            }
        })
        .collect()
}

/// Send every record from a JSON Lines file to the service.
pub async fn import_file(client: &VectorClient, path: &Path) -> Result<ImportStats> {
    let file = fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut stats = ImportStats::default();

    for (line_no, record) in read_import_lines(BufReader::new(file)) {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                eprintln!("Skipping {:#}", e);
                stats.skipped += 1;
                continue;
            }
        };
        match client.add(&record.id, record.vector, record.metadata).await {
            Ok(_) => stats.added += 1,
            Err(e) if e.is_client_error() => {
                eprintln!("line {}: rejected: {}", line_no, e);
                stats.failed += 1;
            }
            Err(e) => return Err(e).with_context(|| format!("line {}: request failed", line_no)),
        }
    }
    Ok(stats)
}

/// Handle `client` subcommands against `endpoint`.
pub async fn handle_client(endpoint: &str, command: ClientCommands) -> Result<()> {
    let client = VectorClient::new(endpoint).context("Invalid endpoint")?;

    match command {
        ClientCommands::Health => {
            let health = client.health().await.context("Health check failed")?;
            println!("Status:    {}", health.status);
            println!("Items:     {}", health.items);
            println!("Dimension: {}", health.dimension);
        }
        ClientCommands::Info => {
            let status = client.status().await.context("Status request failed")?;
            println!("Status:       {}", status.status);
            println!("Items:        {}", status.items);
            println!("Dimension:    {}", status.dimension);
            println!("Max elements: {}", status.max_elements);
        }
        ClientCommands::Add {
            id,
            vector,
            metadata,
        } => {
            let vector = parse_vector_arg(&vector)?;
            let metadata = parse_metadata_arg(metadata.as_deref())?;
            let response = client
                .add(&id, vector, metadata)
                .await
                .context("Add failed")?;
            println!("Added {}", response.id);
        }
        ClientCommands::Search { vector, k } => {
            let vector = parse_vector_arg(&vector)?;
            let response = client.search(vector, k).await.context("Search failed")?;
            println!("{} result(s)", response.count);
            for (rank, hit) in response.results.iter().enumerate() {
                println!(
                    "{:>3}. {} (score {:.4}) {}",
                    rank + 1,
                    hit.id,
                    hit.score,
                    serde_json::Value::Object(hit.metadata.clone())
                );
            }
        }
        ClientCommands::Import { file } => {
            let path = PathBuf::from(shellexpand::tilde(&file).into_owned());
            let stats = import_file(&client, &path).await?;
            println!(
                "Imported {} record(s), {} rejected, {} skipped",
                stats.added, stats.failed, stats.skipped
            );
        }
    }

    Ok(())
}
