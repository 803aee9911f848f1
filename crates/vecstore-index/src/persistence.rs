//! Store state persistence.
//!
//! The engine's exported state and the metadata store are written together as
//! one blob (`vector_index.bin`) so they can never be loaded out of step:
//!
//! ```text
//! magic "VSTORE01" | kind u8 | dimension u32 LE
//! | engine_len u64 LE | engine bytes
//! | metadata_len u64 LE | metadata JSON
//! ```
//!
//! Saves go to a temp file that is fsynced and renamed over the target, so a
//! crash mid-write leaves the previous blob intact. `metadata.json` is an
//! optional human-readable copy of the metadata and is never read back.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};
use vecstore_types::EngineKind;

use crate::engine::{create_engine, restore_engine, EngineConfig, IndexEngine};
use crate::error::{LoadError, VectorError};
use crate::metadata::MetadataStore;

/// Store state blob file name
pub const INDEX_FILE: &str = "vector_index.bin";
/// Metadata sidecar file name
pub const METADATA_FILE: &str = "metadata.json";

const MAGIC: &[u8; 8] = b"VSTORE01";

/// The unit of persistence: engine plus the meaning of each of its slots.
pub struct StoreState {
    pub engine: Box<dyn IndexEngine>,
    pub metadata: MetadataStore,
}

impl StoreState {
    /// Fresh empty state with `config.capacity` reserved.
    pub fn empty(config: &EngineConfig) -> Result<Self, VectorError> {
        Ok(Self {
            engine: create_engine(config)?,
            metadata: MetadataStore::new(),
        })
    }

    /// Engine slots and metadata keys must be the same set.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.engine.len() != self.metadata.len() {
            return Err(format!(
                "engine holds {} vectors but metadata holds {} records",
                self.engine.len(),
                self.metadata.len()
            ));
        }
        // Same size, and every metadata slot present in the engine: equal sets.
        if let Some(slot) = self.metadata.slots().find(|&s| !self.engine.contains(s)) {
            return Err(format!("metadata slot {} missing from engine", slot));
        }
        Ok(())
    }
}

/// Reads and writes the store state under a data directory.
#[derive(Debug, Clone)]
pub struct Persistence {
    dir: PathBuf,
    write_sidecar: bool,
}

impl Persistence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_sidecar: true,
        }
    }

    pub fn with_sidecar(mut self, enabled: bool) -> Self {
        self.write_sidecar = enabled;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// Write the full store state to disk.
    pub fn save(&self, state: &StoreState) -> Result<(), VectorError> {
        fs::create_dir_all(&self.dir)?;

        let blob = encode(state)?;
        let path = self.index_path();
        write_atomic(&path, &blob)?;

        if self.write_sidecar {
            write_atomic(&self.metadata_path(), &state.metadata.to_json(true)?)?;
        }

        debug!(path = ?path, items = state.metadata.len(), bytes = blob.len(), "Saved store state");
        Ok(())
    }

    /// Read and validate the persisted store state.
    pub fn load(&self, config: &EngineConfig) -> Result<StoreState, LoadError> {
        let path = self.index_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(LoadError::NotFound),
            Err(e) => return Err(LoadError::Io(e)),
        };

        let state = decode(&bytes, config)?;
        state.check_consistency().map_err(LoadError::Corrupt)?;

        info!(path = ?path, items = state.metadata.len(), "Loaded existing store");
        Ok(state)
    }

    /// Load the persisted state, or start empty when it is missing or unreadable.
    ///
    /// An unreadable blob is renamed aside (`vector_index.bin.corrupt-<ms>`)
    /// before the fresh state is returned, so the next save does not destroy it.
    pub fn load_or_init(&self, config: &EngineConfig) -> Result<StoreState, VectorError> {
        match self.load(config) {
            Ok(state) => return Ok(state),
            Err(LoadError::NotFound) => {
                info!(path = ?self.index_path(), "No persisted store, starting empty");
            }
            Err(e) => {
                warn!(path = ?self.index_path(), error = %e, "Failed to load store, starting empty");
                self.quarantine();
            }
        }
        StoreState::empty(config)
    }

    fn quarantine(&self) {
        let path = self.index_path();
        let aside = self.dir.join(format!(
            "{}.corrupt-{}",
            INDEX_FILE,
            Utc::now().timestamp_millis()
        ));
        match fs::rename(&path, &aside) {
            Ok(()) => warn!(path = ?aside, "Moved unreadable store aside"),
            Err(e) => warn!(path = ?path, error = %e, "Failed to move unreadable store aside"),
        }
    }
}

fn kind_byte(kind: EngineKind) -> u8 {
    match kind {
        EngineKind::Hnsw => 0,
        EngineKind::Flat => 1,
    }
}

fn kind_from_byte(byte: u8) -> Option<EngineKind> {
    match byte {
        0 => Some(EngineKind::Hnsw),
        1 => Some(EngineKind::Flat),
        _ => None,
    }
}

fn encode(state: &StoreState) -> Result<Vec<u8>, VectorError> {
    let engine_bytes = state.engine.to_bytes()?;
    let metadata_bytes = state.metadata.to_json(false)?;
    let dimension = u32::try_from(state.engine.dimension())
        .map_err(|_| VectorError::Serialization("dimension exceeds u32".to_string()))?;

    let mut blob = Vec::with_capacity(MAGIC.len() + 21 + engine_bytes.len() + metadata_bytes.len());
    blob.extend_from_slice(MAGIC);
    blob.push(kind_byte(state.engine.kind()));
    blob.extend_from_slice(&dimension.to_le_bytes());
    blob.extend_from_slice(&(engine_bytes.len() as u64).to_le_bytes());
    blob.extend_from_slice(&engine_bytes);
    blob.extend_from_slice(&(metadata_bytes.len() as u64).to_le_bytes());
    blob.extend_from_slice(&metadata_bytes);
    Ok(blob)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], LoadError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| LoadError::Corrupt(format!("truncated {}", what)))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self, what: &str) -> Result<u32, LoadError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4, what)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u64(&mut self, what: &str) -> Result<u64, LoadError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8, what)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn section(&mut self, what: &str) -> Result<&'a [u8], LoadError> {
        let len = self.u64(what)?;
        let len = usize::try_from(len)
            .map_err(|_| LoadError::Corrupt(format!("{} length overflows", what)))?;
        self.take(len, what)
    }
}

fn decode(bytes: &[u8], config: &EngineConfig) -> Result<StoreState, LoadError> {
    let mut reader = Reader { bytes, pos: 0 };

    if reader.take(MAGIC.len(), "header")? != MAGIC {
        return Err(LoadError::Corrupt("bad magic".to_string()));
    }

    let kind_raw = reader.take(1, "engine kind")?[0];
    let kind = kind_from_byte(kind_raw)
        .ok_or_else(|| LoadError::Corrupt(format!("unknown engine kind {}", kind_raw)))?;
    if kind != config.kind {
        warn!(
            persisted = %kind,
            configured = %config.kind,
            "Persisted engine differs from configuration, keeping persisted engine"
        );
    }

    let dimension = reader.u32("dimension")? as usize;
    if dimension != config.dimension {
        return Err(LoadError::Corrupt(format!(
            "persisted dimension {} does not match configured {}",
            dimension, config.dimension
        )));
    }

    let engine_bytes = reader.section("engine state")?;
    let metadata_bytes = reader.section("metadata")?;
    if reader.pos != bytes.len() {
        return Err(LoadError::Corrupt("trailing bytes".to_string()));
    }

    let engine = restore_engine(config, kind, engine_bytes)
        .map_err(|e| LoadError::Corrupt(format!("engine state: {}", e)))?;
    let metadata = MetadataStore::from_json(metadata_bytes)
        .map_err(|e| LoadError::Corrupt(format!("metadata: {}", e)))?;

    Ok(StoreState { engine, metadata })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    // Make the rename itself durable
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}
