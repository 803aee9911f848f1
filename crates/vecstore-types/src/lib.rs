//! # vecstore-types
//!
//! Shared types for the vecstore service.
//!
//! - `Settings`: layered daemon configuration
//! - `Record`: what a stored vector slot means to the caller
//! - `api`: JSON bodies exchanged over HTTP, shared by server and client

pub mod api;
pub mod config;
pub mod error;
pub mod record;

pub use api::{
    AddResponse, ErrorResponse, HealthResponse, SearchHit, SearchResponse, StatusResponse,
    DEFAULT_K,
};
pub use config::{EngineKind, Settings};
pub use error::TypesError;
pub use record::{Metadata, Record};
