//! Exact engine: exhaustive cosine-distance scan.
//!
//! Small stores and tests use this; results are exact and deterministic
//! (ties broken by ascending slot).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use vecstore_types::EngineKind;

use crate::engine::{check_dimension, EngineConfig, IndexEngine, Neighbor};
use crate::error::VectorError;

/// Brute-force engine holding vectors in slot order.
pub struct FlatEngine {
    vectors: BTreeMap<u64, Vec<f32>>,
    dimension: usize,
    capacity: usize,
}

#[derive(Serialize, Deserialize)]
struct FlatSnapshot {
    dimension: usize,
    capacity: usize,
    entries: Vec<FlatEntry>,
}

#[derive(Serialize, Deserialize)]
struct FlatEntry {
    slot: u64,
    vector: Vec<f32>,
}

impl FlatEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            vectors: BTreeMap::new(),
            dimension: config.dimension,
            capacity: config.capacity,
        }
    }

    pub fn from_bytes(config: &EngineConfig, bytes: &[u8]) -> Result<Self, VectorError> {
        let snapshot: FlatSnapshot =
            serde_json::from_slice(bytes).map_err(|e| VectorError::Serialization(e.to_string()))?;

        if snapshot.dimension != config.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: config.dimension,
                actual: snapshot.dimension,
            });
        }

        let mut vectors = BTreeMap::new();
        for entry in snapshot.entries {
            check_dimension(snapshot.dimension, &entry.vector)?;
            if vectors.insert(entry.slot, entry.vector).is_some() {
                return Err(VectorError::SlotConflict(entry.slot));
            }
        }

        Ok(Self {
            capacity: snapshot.capacity.max(vectors.len()),
            vectors,
            dimension: snapshot.dimension,
        })
    }
}

/// `1 - cos(a, b)`; zero vectors are treated as orthogonal to everything.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

impl IndexEngine for FlatEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Flat
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn resize(&mut self, capacity: usize) -> Result<(), VectorError> {
        self.capacity = self.capacity.max(capacity);
        Ok(())
    }

    fn insert(&mut self, slot: u64, vector: &[f32]) -> Result<(), VectorError> {
        check_dimension(self.dimension, vector)?;

        if self.vectors.contains_key(&slot) {
            return Err(VectorError::SlotConflict(slot));
        }
        if self.vectors.len() >= self.capacity {
            return Err(VectorError::Index(format!(
                "Index capacity reached: {}",
                self.capacity
            )));
        }

        self.vectors.insert(slot, vector.to_vec());
        Ok(())
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, VectorError> {
        check_dimension(self.dimension, vector)?;

        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .map(|(&slot, stored)| Neighbor::new(slot, cosine_distance(vector, stored)))
            .collect();

        // BTreeMap iteration is slot-ordered and sort_by is stable, so equal
        // distances keep ascending slot order.
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);

        debug!(k = k, found = neighbors.len(), "Flat scan complete");
        Ok(neighbors)
    }

    fn contains(&self, slot: u64) -> bool {
        self.vectors.contains_key(&slot)
    }

    fn to_bytes(&self) -> Result<Vec<u8>, VectorError> {
        let snapshot = FlatSnapshot {
            dimension: self.dimension,
            capacity: self.capacity,
            entries: self
                .vectors
                .iter()
                .map(|(&slot, vector)| FlatEntry {
                    slot,
                    vector: vector.clone(),
                })
                .collect(),
        };
        serde_json::to_vec(&snapshot).map_err(|e| VectorError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(dim: usize, capacity: usize) -> FlatEngine {
        FlatEngine::new(&EngineConfig::new(EngineKind::Flat, dim).with_capacity(capacity))
    }

    #[test]
    fn test_cosine_distance() {
        assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn test_query_orders_nearest_first() {
        let mut e = engine(3, 10);
        e.insert(0, &[0.0, 1.0, 0.0]).unwrap();
        e.insert(1, &[1.0, 0.0, 0.0]).unwrap();
        e.insert(2, &[1.0, 1.0, 0.0]).unwrap();

        let results = e.query(&[1.0, 0.0, 0.0], 3).unwrap();
        let slots: Vec<u64> = results.iter().map(|n| n.slot).collect();
        assert_eq!(slots, vec![1, 2, 0]);
        assert!(results[0].distance.abs() < 1e-6);
    }

    #[test]
    fn test_ties_break_by_slot() {
        let mut e = engine(2, 10);
        e.insert(0, &[0.0, 1.0]).unwrap();
        e.insert(1, &[1.0, 0.0]).unwrap();
        e.insert(2, &[2.0, 0.0]).unwrap();

        let results = e.query(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results[0].slot, 1);
        assert_eq!(results[1].slot, 2);
    }

    #[test]
    fn test_capacity_enforced_until_resize() {
        let mut e = engine(2, 1);
        e.insert(0, &[1.0, 0.0]).unwrap();
        assert!(matches!(
            e.insert(1, &[0.0, 1.0]),
            Err(VectorError::Index(_))
        ));

        e.resize(5).unwrap();
        assert_eq!(e.capacity(), 5);
        e.insert(1, &[0.0, 1.0]).unwrap();
        assert_eq!(e.len(), 2);
    }

    #[test]
    fn test_bytes_roundtrip() {
        let mut e = engine(2, 4);
        e.insert(0, &[1.0, 0.0]).unwrap();
        e.insert(1, &[0.5, 0.5]).unwrap();

        let config = EngineConfig::new(EngineKind::Flat, 2);
        let restored = FlatEngine::from_bytes(&config, &e.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.capacity(), 4);
        assert_eq!(
            restored.query(&[1.0, 0.0], 2).unwrap(),
            e.query(&[1.0, 0.0], 2).unwrap()
        );
    }

    #[test]
    fn test_from_bytes_rejects_wrong_dimension() {
        let e = engine(2, 4);
        let config = EngineConfig::new(EngineKind::Flat, 3);
        let result = FlatEngine::from_bytes(&config, &e.to_bytes().unwrap());
        assert!(matches!(result, Err(VectorError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let config = EngineConfig::new(EngineKind::Flat, 2);
        assert!(matches!(
            FlatEngine::from_bytes(&config, b"not json"),
            Err(VectorError::Serialization(_))
        ));
    }
}
