//! Vector store error types.

use thiserror::Error;

/// Errors that can occur during vector store operations.
#[derive(Debug, Error)]
pub enum VectorError {
    /// Caller input rejected before touching the index
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Index engine error
    #[error("Index error: {0}")]
    Index(String),

    /// Slot already holds a record
    #[error("Slot {0} already assigned")]
    SlotConflict(u64),

    /// Flushing the store state failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A previous writer panicked while holding the store lock
    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl VectorError {
    /// True for errors caused by the caller's input rather than the store.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            VectorError::InvalidInput(_) | VectorError::DimensionMismatch { .. }
        )
    }
}

/// Why a persisted store could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No persisted store at the expected path
    #[error("No persisted store found")]
    NotFound,

    /// File exists but does not decode into a consistent store
    #[error("Corrupt store: {0}")]
    Corrupt(String),

    /// Reading the file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
