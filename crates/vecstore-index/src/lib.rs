//! # vecstore-index
//!
//! Vector store core: maps caller identifiers onto slots of an ANN index,
//! grows the index on demand and keeps the (index, metadata) pair on disk.
//!
//! ## Features
//! - Pluggable engines behind [`IndexEngine`]: usearch HNSW or exact flat scan
//! - Sequential slot allocation with batch capacity growth
//! - Write-through persistence with atomic file replacement
//! - Fresh-store fallback when the persisted state is missing or corrupt

pub mod engine;
pub mod error;
pub mod flat;
pub mod hnsw;
pub mod metadata;
pub mod persistence;
pub mod store;

pub use engine::{EngineConfig, IndexEngine, Neighbor};
pub use error::{LoadError, VectorError};
pub use flat::FlatEngine;
pub use hnsw::HnswEngine;
pub use metadata::MetadataStore;
pub use persistence::{Persistence, StoreState, INDEX_FILE, METADATA_FILE};
pub use store::{StoreStats, VectorStore, GROWTH_INCREMENT};
