//! Client library for the vecstore HTTP API.
//!
//! # Example
//!
//! ```rust,no_run
//! use vecstore_client::{Metadata, VectorClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = VectorClient::new("http://127.0.0.1:8080")?;
//!
//!     client.add("doc-1", vec![0.1, 0.2, 0.3], Metadata::new()).await?;
//!     let hits = client.search(vec![0.1, 0.2, 0.3], Some(3)).await?;
//!
//!     for hit in hits.results {
//!         println!("{} {:.3}", hit.id, hit.score);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;

pub use client::{VectorClient, DEFAULT_ENDPOINT};
pub use error::ClientError;

// Re-export wire types for convenience
pub use vecstore_types::{
    AddResponse, HealthResponse, Metadata, SearchHit, SearchResponse, StatusResponse,
};
