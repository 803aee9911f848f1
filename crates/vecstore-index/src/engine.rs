//! Index engine trait and construction.
//!
//! The engine owns the ANN structure. It knows nothing about caller ids or
//! metadata: it stores vectors under numeric slots and answers k-NN queries
//! with `(slot, distance)` pairs.

use vecstore_types::{EngineKind, Settings};

use crate::error::VectorError;
use crate::flat::FlatEngine;
use crate::hnsw::HnswEngine;

/// One k-NN answer from an engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Slot the vector was inserted under
    pub slot: u64,
    /// Cosine distance, `1 - cos` (lower = more similar)
    pub distance: f32,
}

impl Neighbor {
    pub fn new(slot: u64, distance: f32) -> Self {
        Self { slot, distance }
    }
}

/// Engine construction parameters
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Which implementation to build
    pub kind: EngineKind,
    /// Vector dimension
    pub dimension: usize,
    /// Initial capacity (max elements before a resize)
    pub capacity: usize,
    /// HNSW connections per layer (M)
    pub connectivity: usize,
    /// HNSW build-time search depth (ef_construction)
    pub expansion_add: usize,
    /// HNSW query-time search depth (ef_search)
    pub expansion_search: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Hnsw,
            dimension: 1536, // text-embedding-ada-002
            capacity: 10_000,
            connectivity: 16,
            expansion_add: 200,
            expansion_search: 100,
        }
    }
}

impl EngineConfig {
    pub fn new(kind: EngineKind, dimension: usize) -> Self {
        Self {
            kind,
            dimension,
            ..Default::default()
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            kind: settings.engine,
            dimension: settings.dimension,
            capacity: settings.max_elements,
            connectivity: settings.connectivity,
            expansion_add: settings.expansion_add,
            expansion_search: settings.expansion_search,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_connectivity(mut self, m: usize) -> Self {
        self.connectivity = m;
        self
    }

    pub fn with_expansion(mut self, ef_add: usize, ef_search: usize) -> Self {
        self.expansion_add = ef_add;
        self.expansion_search = ef_search;
        self
    }
}

/// Trait for ANN engines.
///
/// Callers serialize mutation externally; implementations only need to be
/// safe to share between threads.
pub trait IndexEngine: Send + Sync {
    /// Which implementation this is (recorded in the persisted blob)
    fn kind(&self) -> EngineKind;

    /// Get the vector dimension
    fn dimension(&self) -> usize;

    /// Number of vectors in the index
    fn len(&self) -> usize;

    /// Check if the index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of vectors before `resize` is required
    fn capacity(&self) -> usize;

    /// Grow capacity to at least `capacity` elements.
    fn resize(&mut self, capacity: usize) -> Result<(), VectorError>;

    /// Insert a vector under `slot`.
    /// Fails when the slot is taken or capacity is exhausted.
    fn insert(&mut self, slot: u64, vector: &[f32]) -> Result<(), VectorError>;

    /// k nearest neighbors, nearest first, at most `min(k, len)` entries.
    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, VectorError>;

    /// Check if a slot is present
    fn contains(&self, slot: u64) -> bool;

    /// Export internal state for persistence
    fn to_bytes(&self) -> Result<Vec<u8>, VectorError>;
}

/// Build an empty engine from config.
pub fn create_engine(config: &EngineConfig) -> Result<Box<dyn IndexEngine>, VectorError> {
    Ok(match config.kind {
        EngineKind::Hnsw => Box::new(HnswEngine::new(config)?),
        EngineKind::Flat => Box::new(FlatEngine::new(config)),
    })
}

/// Rebuild an engine of `kind` from bytes produced by [`IndexEngine::to_bytes`].
pub fn restore_engine(
    config: &EngineConfig,
    kind: EngineKind,
    bytes: &[u8],
) -> Result<Box<dyn IndexEngine>, VectorError> {
    Ok(match kind {
        EngineKind::Hnsw => Box::new(HnswEngine::from_bytes(config, bytes)?),
        EngineKind::Flat => Box::new(FlatEngine::from_bytes(config, bytes)?),
    })
}

pub(crate) fn check_dimension(expected: usize, vector: &[f32]) -> Result<(), VectorError> {
    if vector.len() != expected {
        return Err(VectorError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}
