//! Stored record type.

use serde::{Deserialize, Serialize};

/// Arbitrary JSON object attached to a vector by the caller.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// What a slot in the index means to the caller.
///
/// Written once at insertion time and never changed afterwards.
/// `external_id` is not unique: inserting the same id twice yields two
/// records in two slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Caller-supplied identifier
    #[serde(rename = "id")]
    pub external_id: String,
    /// Caller-supplied metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl Record {
    pub fn new(external_id: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            external_id: external_id.into(),
            metadata,
        }
    }
}
