//! HTTP response bodies.
//!
//! Request bodies are parsed field by field in the service so that missing
//! fields surface as structured errors; only responses are typed here.

use serde::{Deserialize, Serialize};

use crate::record::Metadata;

/// Number of results returned by `/search` when `k` is omitted.
pub const DEFAULT_K: usize = 5;

/// `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub items: usize,
    pub dimension: usize,
}

/// `GET /status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub items: usize,
    pub dimension: usize,
    pub max_elements: usize,
}

/// `POST /add` success body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddResponse {
    pub status: String,
    pub id: String,
}

/// One entry of a `/search` result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Caller-supplied identifier of the matched vector
    pub id: String,
    /// Similarity, `1 - cosine distance` (higher = more similar)
    pub score: f32,
    pub metadata: Metadata,
}

/// `POST /search` success body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub status: String,
    pub results: Vec<SearchHit>,
    pub count: usize,
}

impl SearchResponse {
    pub fn success(results: Vec<SearchHit>) -> Self {
        Self {
            status: "success".to_string(),
            count: results.len(),
            results,
        }
    }
}

/// Body of every 4xx/5xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
