//! Configuration loading for vecstore.
//!
//! Layered config: defaults -> config file -> `PORT` -> `VECSTORE_*` env vars -> CLI flags.
//! Default config file lives at `<config dir>/vecstore/config.toml`.

use std::fmt;
use std::path::PathBuf;

use config::{Config, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// Which ANN engine backs the store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// usearch HNSW graph (default)
    #[default]
    Hnsw,
    /// Exhaustive scan, exact results
    Flat,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Hnsw => "hnsw",
            EngineKind::Flat => "flat",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// HTTP listen host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding `vector_index.bin` and `metadata.json`
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Vector dimension (OpenAI embeddings by default)
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Initial engine capacity; reported by `/status`
    #[serde(default = "default_max_elements")]
    pub max_elements: usize,

    /// ANN engine
    #[serde(default)]
    pub engine: EngineKind,

    /// HNSW connections per layer (M)
    #[serde(default = "default_connectivity")]
    pub connectivity: usize,

    /// HNSW build-time search depth (ef_construction)
    #[serde(default = "default_expansion_add")]
    pub expansion_add: usize,

    /// HNSW query-time search depth (ef_search)
    #[serde(default = "default_expansion_search")]
    pub expansion_search: usize,

    /// Also write a human-readable `metadata.json` next to the index blob
    #[serde(default = "default_true")]
    pub write_metadata_sidecar: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> String {
    ProjectDirs::from("", "", "vecstore")
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
        .to_string_lossy()
        .to_string()
}

fn default_dimension() -> usize {
    1536
}

fn default_max_elements() -> usize {
    10_000
}

fn default_connectivity() -> usize {
    16
}

fn default_expansion_add() -> usize {
    200
}

fn default_expansion_search() -> usize {
    100
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            dimension: default_dimension(),
            max_elements: default_max_elements(),
            engine: EngineKind::default(),
            connectivity: default_connectivity(),
            expansion_add: default_expansion_add(),
            expansion_search: default_expansion_search(),
            write_metadata_sidecar: default_true(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (`<config dir>/vecstore/config.toml`)
    /// 3. CLI-specified config file (optional)
    /// 4. `PORT` environment variable
    /// 5. Environment variables (`VECSTORE_*`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TypesError> {
        let config_dir = ProjectDirs::from("", "", "vecstore")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("host", default_host())
            .map_err(config_err)?
            .set_default("port", default_port() as i64)
            .map_err(config_err)?
            .set_default("data_dir", default_data_dir())
            .map_err(config_err)?
            .set_default("dimension", default_dimension() as i64)
            .map_err(config_err)?
            .set_default("max_elements", default_max_elements() as i64)
            .map_err(config_err)?
            .set_default("engine", EngineKind::default().as_str())
            .map_err(config_err)?
            .set_default("log_level", default_log_level())
            .map_err(config_err)?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Plain PORT is what container platforms set; VECSTORE_PORT still wins.
        if let Some(port) = std::env::var("PORT")
            .ok()
            .and_then(|p| p.trim().parse::<u16>().ok())
        {
            builder = builder.add_source(File::from_str(
                &format!("port = {}", port),
                FileFormat::Toml,
            ));
        }

        // VECSTORE_DATA_DIR, VECSTORE_MAX_ELEMENTS, ...
        builder = builder.add_source(
            Environment::with_prefix("VECSTORE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .map_err(config_err)?
            .try_deserialize()
            .map_err(config_err)?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the store cannot run with.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.dimension == 0 {
            return Err(TypesError::InvalidInput("dimension must be > 0".to_string()));
        }
        if self.max_elements == 0 {
            return Err(TypesError::InvalidInput(
                "max_elements must be > 0".to_string(),
            ));
        }
        if self.connectivity == 0 {
            return Err(TypesError::InvalidInput(
                "connectivity must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Socket address string for the HTTP server
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Expand `~/` in data_dir to the home directory
    pub fn expanded_data_dir(&self) -> PathBuf {
        if let Some(rest) = self.data_dir.strip_prefix("~/") {
            if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
                return home.join(rest);
            }
        }
        PathBuf::from(&self.data_dir)
    }
}

fn config_err(e: config::ConfigError) -> TypesError {
    TypesError::Config(e.to_string())
}
