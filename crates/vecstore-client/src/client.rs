//! HTTP client for a running vecstore service.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use vecstore_types::{
    AddResponse, ErrorResponse, HealthResponse, Metadata, SearchResponse, StatusResponse,
};

use crate::error::ClientError;

/// Default endpoint for the vecstore service.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080";

/// Client for the vecstore HTTP API. Cheap to clone.
#[derive(Debug, Clone)]
pub struct VectorClient {
    http: Client,
    base_url: String,
}

impl VectorClient {
    /// Create a client for `endpoint` (e.g. `http://localhost:8080`).
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidEndpoint` if the URL is not http(s).
    pub fn new(endpoint: &str) -> Result<Self, ClientError> {
        let base_url = endpoint.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidEndpoint(endpoint.to_string()));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self.http.get(self.url("/health")).send().await?;
        decode(response).await
    }

    /// `GET /status`
    pub async fn status(&self) -> Result<StatusResponse, ClientError> {
        let response = self.http.get(self.url("/status")).send().await?;
        decode(response).await
    }

    /// Store a vector under `id`.
    pub async fn add(
        &self,
        id: &str,
        vector: Vec<f32>,
        metadata: Metadata,
    ) -> Result<AddResponse, ClientError> {
        debug!(id = %id, dim = vector.len(), "Add request");
        let body = json!({
            "id": id,
            "vector": vector,
            "metadata": metadata,
        });
        let response = self.http.post(self.url("/add")).json(&body).send().await?;
        decode(response).await
    }

    /// Search for the `k` most similar vectors (server default when `None`).
    pub async fn search(
        &self,
        vector: Vec<f32>,
        k: Option<usize>,
    ) -> Result<SearchResponse, ClientError> {
        debug!(dim = vector.len(), k = ?k, "Search request");
        let mut body = json!({ "vector": vector });
        if let Some(k) = k {
            body["k"] = json!(k);
        }
        let response = self
            .http
            .post(self.url("/search"))
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|e| e.error)
        .unwrap_or(text);
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
