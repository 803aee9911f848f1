//! HNSW engine implementation using usearch.
//!
//! Parameters tuned for quality over speed:
//! - M = 16 (connections per layer)
//! - ef_construction = 200 (build-time quality)
//! - ef_search = 100 (search-time quality)

use tracing::{debug, info};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};
use vecstore_types::EngineKind;

use crate::engine::{check_dimension, EngineConfig, IndexEngine, Neighbor};
use crate::error::VectorError;

/// HNSW engine wrapper around usearch.
pub struct HnswEngine {
    index: Index,
    dimension: usize,
}

fn index_options(config: &EngineConfig) -> IndexOptions {
    IndexOptions {
        dimensions: config.dimension,
        metric: MetricKind::Cos, // distance = 1 - cosine similarity
        quantization: ScalarKind::F32,
        connectivity: config.connectivity,
        expansion_add: config.expansion_add,
        expansion_search: config.expansion_search,
        multi: false, // one vector per slot
    }
}

impl HnswEngine {
    /// Create an empty index with `config.capacity` reserved.
    pub fn new(config: &EngineConfig) -> Result<Self, VectorError> {
        let index =
            Index::new(&index_options(config)).map_err(|e| VectorError::Index(e.to_string()))?;
        index
            .reserve(config.capacity)
            .map_err(|e| VectorError::Index(e.to_string()))?;

        info!(
            dim = config.dimension,
            capacity = config.capacity,
            "Created new HNSW index"
        );
        Ok(Self {
            index,
            dimension: config.dimension,
        })
    }

    /// Restore an index from bytes produced by `to_bytes`.
    pub fn from_bytes(config: &EngineConfig, bytes: &[u8]) -> Result<Self, VectorError> {
        let index =
            Index::new(&index_options(config)).map_err(|e| VectorError::Index(e.to_string()))?;
        index
            .load_from_buffer(bytes)
            .map_err(|e| VectorError::Index(format!("Failed to load: {}", e)))?;

        if index.dimensions() != config.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: config.dimension,
                actual: index.dimensions(),
            });
        }

        debug!(vectors = index.size(), "Restored HNSW index");
        Ok(Self {
            index,
            dimension: config.dimension,
        })
    }
}

impl IndexEngine for HnswEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Hnsw
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.index.size()
    }

    fn capacity(&self) -> usize {
        self.index.capacity()
    }

    fn resize(&mut self, capacity: usize) -> Result<(), VectorError> {
        self.index
            .reserve(capacity)
            .map_err(|e| VectorError::Index(format!("Failed to resize: {}", e)))?;
        info!(capacity = self.index.capacity(), "Resized HNSW index");
        Ok(())
    }

    fn insert(&mut self, slot: u64, vector: &[f32]) -> Result<(), VectorError> {
        check_dimension(self.dimension, vector)?;

        if self.index.contains(slot) {
            return Err(VectorError::SlotConflict(slot));
        }
        if self.index.size() >= self.index.capacity() {
            return Err(VectorError::Index(format!(
                "Index capacity reached: {}",
                self.index.capacity()
            )));
        }

        self.index
            .add(slot, vector)
            .map_err(|e| VectorError::Index(e.to_string()))?;

        debug!(slot = slot, "Added vector");
        Ok(())
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, VectorError> {
        check_dimension(self.dimension, vector)?;

        // usearch sizes its result buffers by k before searching
        let k = k.min(self.index.size());
        if k == 0 {
            return Ok(Vec::new());
        }

        let matches = self
            .index
            .search(vector, k)
            .map_err(|e| VectorError::Index(e.to_string()))?;

        let neighbors: Vec<Neighbor> = matches
            .keys
            .iter()
            .zip(matches.distances.iter())
            .map(|(&slot, &distance)| Neighbor::new(slot, distance))
            .collect();

        debug!(k = k, found = neighbors.len(), "Search complete");
        Ok(neighbors)
    }

    fn contains(&self, slot: u64) -> bool {
        self.index.contains(slot)
    }

    fn to_bytes(&self) -> Result<Vec<u8>, VectorError> {
        let mut buffer = vec![0u8; self.index.serialized_length()];
        self.index
            .save_to_buffer(&mut buffer)
            .map_err(|e| VectorError::Index(format!("Failed to save: {}", e)))?;
        Ok(buffer)
    }
}
