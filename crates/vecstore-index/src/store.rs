//! Vector store manager.
//!
//! Allocates slots, grows the engine, records metadata and flushes the whole
//! state on every insert. One `RwLock` guards the state: inserts (including
//! their flush) hold the write lock, queries share the read lock.

use std::sync::{PoisonError, RwLock};

use tracing::{debug, error, info, warn};
use vecstore_types::{Metadata, Record, SearchHit, Settings};

use crate::engine::{EngineConfig, IndexEngine};
use crate::error::VectorError;
use crate::persistence::{Persistence, StoreState};

/// Capacity added whenever the engine is full.
pub const GROWTH_INCREMENT: usize = 1000;

/// Store statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of records
    pub items: usize,
    /// Vector dimension
    pub dimension: usize,
    /// Configured initial capacity
    pub max_elements: usize,
    /// Current engine capacity (grows past max_elements)
    pub capacity: usize,
}

/// Shared handle over one store state.
pub struct VectorStore {
    state: RwLock<StoreState>,
    persistence: Persistence,
    config: EngineConfig,
}

impl VectorStore {
    /// Open the store in `persistence`'s directory, starting empty if nothing
    /// usable is persisted there.
    pub fn open(config: EngineConfig, persistence: Persistence) -> Result<Self, VectorError> {
        let state = persistence.load_or_init(&config)?;
        info!(
            dir = ?persistence.dir(),
            engine = %state.engine.kind(),
            items = state.metadata.len(),
            dimension = config.dimension,
            "Vector store ready"
        );
        Ok(Self {
            state: RwLock::new(state),
            persistence,
            config,
        })
    }

    /// Open using daemon settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, VectorError> {
        let persistence = Persistence::new(settings.expanded_data_dir())
            .with_sidecar(settings.write_metadata_sidecar);
        Self::open(EngineConfig::from_settings(settings), persistence)
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    fn validate_vector(&self, vector: &[f32]) -> Result<(), VectorError> {
        if vector.is_empty() {
            return Err(VectorError::InvalidInput("vector is empty".to_string()));
        }
        if vector.len() != self.config.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.config.dimension,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(VectorError::InvalidInput(
                "vector contains non-finite values".to_string(),
            ));
        }
        Ok(())
    }

    /// Insert a vector and flush the store.
    ///
    /// Writes engine, then metadata, then disk. If the flush fails the
    /// in-memory store keeps the new record and is ahead of disk until the
    /// next successful flush; the call still reports the failure.
    ///
    /// Returns the slot assigned to the vector.
    pub fn insert(
        &self,
        external_id: &str,
        vector: &[f32],
        metadata: Metadata,
    ) -> Result<u64, VectorError> {
        if external_id.is_empty() {
            return Err(VectorError::InvalidInput("id is empty".to_string()));
        }
        self.validate_vector(vector)?;

        let mut state = self
            .state
            .write()
            .map_err(|_| VectorError::LockPoisoned)?;

        let count = state.engine.len();
        let slot = count as u64;
        if state.metadata.contains(slot) {
            error!(slot = slot, "Slot already has metadata, store out of sync");
            return Err(VectorError::SlotConflict(slot));
        }

        if count >= state.engine.capacity() {
            let new_capacity = count + GROWTH_INCREMENT;
            info!(from = state.engine.capacity(), to = new_capacity, "Growing index");
            state.engine.resize(new_capacity)?;
        }

        state.engine.insert(slot, vector)?;
        state
            .metadata
            .set(slot, Record::new(external_id, metadata))?;

        if let Err(e) = self.persistence.save(&state) {
            error!(slot = slot, id = %external_id, error = %e, "Flush failed, memory is ahead of disk");
            return Err(VectorError::Persistence(e.to_string()));
        }

        debug!(slot = slot, id = %external_id, items = state.metadata.len(), "Inserted vector");
        Ok(slot)
    }

    /// k most similar stored vectors, most similar first.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>, VectorError> {
        if k == 0 {
            return Err(VectorError::InvalidInput("k must be >= 1".to_string()));
        }
        self.validate_vector(vector)?;

        let state = self.state.read().map_err(|_| VectorError::LockPoisoned)?;
        if state.engine.is_empty() {
            return Ok(Vec::new());
        }

        let k = k.min(state.engine.len());
        let neighbors = state.engine.query(vector, k)?;

        let mut hits = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            let Some(record) = state.metadata.get(neighbor.slot) else {
                warn!(slot = neighbor.slot, "Engine returned slot without metadata, skipping");
                continue;
            };
            hits.push(SearchHit {
                id: record.external_id.clone(),
                // Cosine distance lies in [0, 2]; this conversion is cosine-specific.
                score: 1.0 - neighbor.distance,
                metadata: record.metadata.clone(),
            });
        }

        debug!(k = k, found = hits.len(), "Query complete");
        Ok(hits)
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.read_state().metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.read_state();
        StoreStats {
            items: state.metadata.len(),
            dimension: self.config.dimension,
            max_elements: self.config.capacity,
            capacity: state.engine.capacity(),
        }
    }

    /// Slots currently carrying `external_id`.
    pub fn slots_for_id(&self, external_id: &str) -> Vec<u64> {
        self.read_state().metadata.find_by_id(external_id)
    }

    /// Flush the current state without inserting.
    pub fn flush(&self) -> Result<(), VectorError> {
        let state = self.state.read().map_err(|_| VectorError::LockPoisoned)?;
        self.persistence
            .save(&state)
            .map_err(|e| VectorError::Persistence(e.to_string()))
    }

    // Reporting paths still answer after a poisoned lock.
    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use vecstore_types::EngineKind;

    const DIM: usize = 4;

    fn open_store(dir: &std::path::Path, kind: EngineKind, capacity: usize) -> VectorStore {
        let config = EngineConfig::new(kind, DIM).with_capacity(capacity);
        VectorStore::open(config, Persistence::new(dir)).unwrap()
    }

    fn unit(i: usize) -> Vec<f32> {
        let mut v = vec![0.0; DIM];
        v[i % DIM] = 1.0;
        v
    }

    fn tag(t: &str) -> Metadata {
        let mut m = Metadata::new();
        m.insert("tag".to_string(), json!(t));
        m
    }

    #[test]
    fn test_concrete_scenario() {
        let temp = TempDir::new().unwrap();
        let store = open_store(temp.path(), EngineKind::Flat, 10);

        store.insert("a", &unit(0), tag("x")).unwrap();
        store.insert("b", &unit(1), Metadata::new()).unwrap();

        let hits = store.query(&unit(0), 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(hits[0].metadata["tag"], "x");
    }

    #[test]
    fn test_slots_are_sequential() {
        let temp = TempDir::new().unwrap();
        let store = open_store(temp.path(), EngineKind::Flat, 10);

        let slots: Vec<u64> = (0..6)
            .map(|i| store.insert(&format!("id-{}", i), &unit(i), Metadata::new()).unwrap())
            .collect();
        assert_eq!(slots, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_growth_past_capacity() {
        let temp = TempDir::new().unwrap();
        let store = open_store(temp.path(), EngineKind::Flat, 3);

        store.insert("first", &[1.0, 0.2, 0.0, 0.0], Metadata::new()).unwrap();
        let before = store.query(&[1.0, 0.0, 0.0, 0.0], 1).unwrap();

        for i in 1..4 {
            store.insert(&format!("id-{}", i), &unit(i), Metadata::new()).unwrap();
        }
        let stats = store.stats();
        assert_eq!(stats.items, 4);
        assert_eq!(stats.max_elements, 3);
        assert_eq!(stats.capacity, 3 + GROWTH_INCREMENT);

        let after = store.query(&[1.0, 0.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(after[0].id, "first");
        assert_eq!(before[0].score, after[0].score);
    }

    #[test]
    fn test_growth_with_hnsw_keeps_scores() {
        let temp = TempDir::new().unwrap();
        let store = open_store(temp.path(), EngineKind::Hnsw, 2);
        let initial_capacity = store.stats().capacity;

        store.insert("anchor", &[1.0, 0.2, 0.0, 0.0], tag("a")).unwrap();
        let before = store.query(&[1.0, 0.0, 0.0, 0.0], 1).unwrap();

        for i in 0..=initial_capacity {
            store
                .insert(&format!("id-{}", i), &[0.0, 1.0, i as f32, 0.25], Metadata::new())
                .unwrap();
        }
        assert_eq!(store.len(), initial_capacity + 2);
        assert!(store.stats().capacity > initial_capacity);

        let after = store.query(&[1.0, 0.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(after[0].id, "anchor");
        assert_eq!(after[0].metadata, before[0].metadata);
        assert!((after[0].score - before[0].score).abs() < 1e-6);
    }

    #[test]
    fn test_hnsw_insert_after_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let store = open_store(temp.path(), EngineKind::Hnsw, 2);
            for i in 0..5 {
                store.insert(&format!("id-{}", i), &unit(i), Metadata::new()).unwrap();
            }
        }

        // A restored index may come back exactly full; the next insert must grow it
        let store = open_store(temp.path(), EngineKind::Hnsw, 2);
        assert_eq!(store.len(), 5);
        let slot = store
            .insert("late", &[0.5, 0.5, 0.5, 0.0], Metadata::new())
            .unwrap();
        assert_eq!(slot, 5);
        assert_eq!(store.len(), 6);
        assert!(store.stats().capacity > 5);

        let hits = store.query(&[0.5, 0.5, 0.5, 0.0], 1).unwrap();
        assert_eq!(hits[0].id, "late");
    }

    #[test]
    fn test_hnsw_huge_k_returns_all_items() {
        let temp = TempDir::new().unwrap();
        let store = open_store(temp.path(), EngineKind::Hnsw, 10);
        store.insert("only", &unit(0), Metadata::new()).unwrap();

        let hits = store.query(&unit(0), 1usize << 40).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "only");
    }

    #[test]
    fn test_k_larger_than_store() {
        let temp = TempDir::new().unwrap();
        let store = open_store(temp.path(), EngineKind::Flat, 10);
        for i in 0..3 {
            store.insert(&format!("id-{}", i), &unit(i), Metadata::new()).unwrap();
        }
        assert_eq!(store.query(&unit(0), 10).unwrap().len(), 3);
    }

    #[test]
    fn test_query_empty_store() {
        let temp = TempDir::new().unwrap();
        let store = open_store(temp.path(), EngineKind::Hnsw, 10);
        assert!(store.query(&unit(0), 5).unwrap().is_empty());
    }

    #[test]
    fn test_results_ordered_by_score() {
        let temp = TempDir::new().unwrap();
        let store = open_store(temp.path(), EngineKind::Flat, 10);
        store.insert("far", &[0.0, 1.0, 0.0, 0.0], Metadata::new()).unwrap();
        store.insert("near", &[1.0, 0.1, 0.0, 0.0], Metadata::new()).unwrap();
        store.insert("mid", &[1.0, 1.0, 0.0, 0.0], Metadata::new()).unwrap();

        let hits = store.query(&[1.0, 0.0, 0.0, 0.0], 3).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
        assert!(hits[0].score >= hits[1].score && hits[1].score >= hits[2].score);
    }

    #[test]
    fn test_duplicate_ids_are_separate_records() {
        let temp = TempDir::new().unwrap();
        let store = open_store(temp.path(), EngineKind::Flat, 10);
        store.insert("dup", &unit(0), tag("one")).unwrap();
        store.insert("dup", &unit(1), tag("two")).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.slots_for_id("dup"), vec![0, 1]);
    }

    #[test]
    fn test_validation_leaves_store_unchanged() {
        let temp = TempDir::new().unwrap();
        let store = open_store(temp.path(), EngineKind::Flat, 10);

        assert!(matches!(
            store.insert("", &unit(0), Metadata::new()),
            Err(VectorError::InvalidInput(_))
        ));
        assert!(matches!(
            store.insert("a", &[], Metadata::new()),
            Err(VectorError::InvalidInput(_))
        ));
        assert!(matches!(
            store.insert("a", &[1.0, 0.0], Metadata::new()),
            Err(VectorError::DimensionMismatch { expected: 4, actual: 2 })
        ));
        assert!(matches!(
            store.insert("a", &[f32::NAN, 0.0, 0.0, 0.0], Metadata::new()),
            Err(VectorError::InvalidInput(_))
        ));
        assert!(matches!(
            store.query(&unit(0), 0),
            Err(VectorError::InvalidInput(_))
        ));
        assert!(store.is_empty());
        assert!(!store.persistence().index_path().exists());
    }

    #[test]
    fn test_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let probe = [0.9, 0.1, 0.0, 0.0];
        let before = {
            let store = open_store(temp.path(), EngineKind::Flat, 10);
            store.insert("a", &unit(0), tag("x")).unwrap();
            store.insert("b", &unit(1), Metadata::new()).unwrap();
            store.query(&probe, 2).unwrap()
        };

        let store = open_store(temp.path(), EngineKind::Flat, 10);
        assert_eq!(store.len(), 2);
        assert_eq!(store.query(&probe, 2).unwrap(), before);

        // New inserts continue after the restored slots
        assert_eq!(store.insert("c", &unit(2), Metadata::new()).unwrap(), 2);
    }

    #[test]
    fn test_flush_failure_reports_error() {
        let temp = TempDir::new().unwrap();
        // A regular file where the data directory should be
        let blocker = temp.path().join("blocked");
        std::fs::write(&blocker, b"").unwrap();

        let store = open_store(&blocker, EngineKind::Flat, 10);
        let result = store.insert("a", &unit(0), Metadata::new());
        assert!(matches!(result, Err(VectorError::Persistence(_))));
        // Documented window: memory is ahead of disk
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_from_settings() {
        let temp = TempDir::new().unwrap();
        let settings = Settings {
            data_dir: temp.path().to_string_lossy().to_string(),
            dimension: DIM,
            max_elements: 5,
            engine: EngineKind::Flat,
            write_metadata_sidecar: false,
            ..Default::default()
        };
        let store = VectorStore::from_settings(&settings).unwrap();
        store.insert("a", &unit(0), Metadata::new()).unwrap();

        let stats = store.stats();
        assert_eq!(stats.dimension, DIM);
        assert_eq!(stats.max_elements, 5);
        assert!(store.persistence().index_path().exists());
        assert!(!store.persistence().metadata_path().exists());
    }
}
