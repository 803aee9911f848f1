//! Error types for the vecstore client.

use thiserror::Error;

/// Errors that can occur when using the vecstore client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure or undecodable response
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with an error status
    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Invalid endpoint URL
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl ClientError {
    /// True for 4xx answers: retrying the same request will not help.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ClientError::Api { status, .. } if (400..500).contains(status))
    }
}
