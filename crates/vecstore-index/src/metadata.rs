//! Slot metadata storage.
//!
//! Maps internal slots (u64) to the caller's id and metadata. Held in memory
//! and persisted alongside the engine by [`crate::persistence`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use vecstore_types::{Metadata, Record};

use crate::error::VectorError;

/// Serialized form of one slot, also the layout of `metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MetadataEntry {
    slot: u64,
    #[serde(flatten)]
    record: Record,
}

/// In-memory slot -> record map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataStore {
    records: BTreeMap<u64, Record>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the record for a slot.
    pub fn get(&self, slot: u64) -> Option<&Record> {
        self.records.get(&slot)
    }

    /// Store a record. Slots are written once; a second write is a fault.
    pub fn set(&mut self, slot: u64, record: Record) -> Result<(), VectorError> {
        if self.records.contains_key(&slot) {
            return Err(VectorError::SlotConflict(slot));
        }
        debug!(slot = slot, id = %record.external_id, "Stored metadata");
        self.records.insert(slot, record);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn set_entry(
        &mut self,
        slot: u64,
        external_id: &str,
        metadata: Metadata,
    ) -> Result<(), VectorError> {
        self.set(slot, Record::new(external_id, metadata))
    }

    /// Count total records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, slot: u64) -> bool {
        self.records.contains_key(&slot)
    }

    /// Slots in ascending order
    pub fn slots(&self) -> impl Iterator<Item = u64> + '_ {
        self.records.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &Record)> {
        self.records.iter().map(|(&slot, record)| (slot, record))
    }

    /// Slots whose record carries `external_id`. Ids are not unique, so this
    /// may return several slots.
    pub fn find_by_id(&self, external_id: &str) -> Vec<u64> {
        self.records
            .iter()
            .filter(|(_, r)| r.external_id == external_id)
            .map(|(&slot, _)| slot)
            .collect()
    }

    /// Encode as a JSON array of `{slot, id, metadata}`.
    pub fn to_json(&self, pretty: bool) -> Result<Vec<u8>, VectorError> {
        let entries: Vec<MetadataEntry> = self
            .records
            .iter()
            .map(|(&slot, record)| MetadataEntry {
                slot,
                record: record.clone(),
            })
            .collect();

        let encoded = if pretty {
            serde_json::to_vec_pretty(&entries)
        } else {
            serde_json::to_vec(&entries)
        };
        encoded.map_err(|e| VectorError::Serialization(e.to_string()))
    }

    /// Decode the output of `to_json`. Duplicate slots are rejected.
    pub fn from_json(bytes: &[u8]) -> Result<Self, VectorError> {
        let entries: Vec<MetadataEntry> =
            serde_json::from_slice(bytes).map_err(|e| VectorError::Serialization(e.to_string()))?;

        let mut store = Self::new();
        for entry in entries {
            store.set(entry.slot, entry.record)?;
        }
        Ok(store)
    }
}
