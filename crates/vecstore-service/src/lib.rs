//! HTTP API for vecstore.
//!
//! Routes:
//! - `GET /health`, `GET /status`: item count and dimension
//! - `POST /add`: store a vector under a caller id
//! - `POST /search`: k most similar vectors
//!
//! Handlers share one `Arc<VectorStore>` through axum state; store calls run
//! on the blocking pool because every insert flushes to disk.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use server::{create_router, run_server, run_server_with_shutdown, serve_with_shutdown};
