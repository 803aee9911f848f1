//! Route handlers.
//!
//! Bodies are taken as raw JSON values and picked apart by hand so that a
//! missing or mistyped field becomes a 400 `{error}` instead of axum's
//! default plain-text rejection.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::Value;
use tracing::{debug, info};

use vecstore_index::VectorStore;
use vecstore_types::{
    AddResponse, HealthResponse, Metadata, SearchResponse, StatusResponse, DEFAULT_K,
};

use crate::error::ApiError;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<VectorStore>,
}

impl AppState {
    pub fn new(store: Arc<VectorStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug)]
struct AddRequest {
    id: String,
    vector: Vec<f32>,
    metadata: Metadata,
}

#[derive(Debug)]
struct SearchRequest {
    vector: Vec<f32>,
    k: usize,
}

fn body_or_400(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text())))
}

/// `None` for absent, null or empty; error for anything that is not a list of numbers.
fn parse_vector(value: Option<&Value>) -> Result<Option<Vec<f32>>, ApiError> {
    let items = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) if items.is_empty() => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(ApiError::BadRequest(
                "vector must be an array of numbers".to_string(),
            ))
        }
    };

    items
        .iter()
        .map(|item| {
            item.as_f64().map(|f| f as f32).ok_or_else(|| {
                ApiError::BadRequest("vector must be an array of numbers".to_string())
            })
        })
        .collect::<Result<Vec<f32>, ApiError>>()
        .map(Some)
}

fn parse_add(body: &Value) -> Result<AddRequest, ApiError> {
    let id = match body.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(ApiError::BadRequest("id must be a string".to_string())),
    };
    let vector = parse_vector(body.get("vector"))?;

    let (Some(id), Some(vector)) = (id, vector) else {
        return Err(ApiError::BadRequest("Missing id or vector".to_string()));
    };

    let metadata = match body.get("metadata") {
        None | Some(Value::Null) => Metadata::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => {
            return Err(ApiError::BadRequest(
                "metadata must be an object".to_string(),
            ))
        }
    };

    Ok(AddRequest {
        id,
        vector,
        metadata,
    })
}

fn parse_search(body: &Value) -> Result<SearchRequest, ApiError> {
    let vector = parse_vector(body.get("vector"))?
        .ok_or_else(|| ApiError::BadRequest("Missing query vector".to_string()))?;

    let k = match body.get("k") {
        None | Some(Value::Null) => DEFAULT_K,
        Some(value) => match value.as_u64() {
            Some(k) if k >= 1 => usize::try_from(k).unwrap_or(usize::MAX),
            _ => {
                return Err(ApiError::BadRequest(
                    "k must be a positive integer".to_string(),
                ))
            }
        },
    };

    Ok(SearchRequest { vector, k })
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.store.stats();
    Json(HealthResponse {
        status: "healthy".to_string(),
        items: stats.items,
        dimension: stats.dimension,
    })
}

/// `GET /status`
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let stats = state.store.stats();
    Json(StatusResponse {
        status: "running".to_string(),
        items: stats.items,
        dimension: stats.dimension,
        max_elements: stats.max_elements,
    })
}

/// `POST /add`
pub async fn add(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AddResponse>, ApiError> {
    let body = body_or_400(payload)?;
    let request = parse_add(&body)?;

    debug!(id = %request.id, dim = request.vector.len(), "Add request");

    let store = state.store.clone();
    let AddRequest {
        id,
        vector,
        metadata,
    } = request;
    let insert_id = id.clone();
    let slot = tokio::task::spawn_blocking(move || store.insert(&insert_id, &vector, metadata))
        .await
        .map_err(|e| ApiError::Internal(format!("Task error: {}", e)))??;

    info!(id = %id, slot = slot, "Added vector");
    Ok(Json(AddResponse {
        status: "success".to_string(),
        id,
    }))
}

/// `POST /search`
pub async fn search(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let body = body_or_400(payload)?;
    let SearchRequest { vector, k } = parse_search(&body)?;

    let store = state.store.clone();
    let hits = tokio::task::spawn_blocking(move || store.query(&vector, k))
        .await
        .map_err(|e| ApiError::Internal(format!("Task error: {}", e)))??;

    debug!(k = k, found = hits.len(), "Search complete");
    Ok(Json(SearchResponse::success(hits)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_add_full() {
        let body = json!({"id": "a", "vector": [1, 0.5, -2], "metadata": {"tag": "x"}});
        let req = parse_add(&body).unwrap();
        assert_eq!(req.id, "a");
        assert_eq!(req.vector, vec![1.0, 0.5, -2.0]);
        assert_eq!(req.metadata["tag"], "x");
    }

    #[test]
    fn test_parse_add_missing_fields() {
        for body in [
            json!({"vector": [1.0]}),
            json!({"id": "a"}),
            json!({"id": "", "vector": [1.0]}),
            json!({"id": "a", "vector": []}),
            json!({"id": null, "vector": null}),
            json!([1, 2, 3]),
        ] {
            let err = parse_add(&body).unwrap_err();
            assert_eq!(err.to_string(), "Missing id or vector", "body: {}", body);
        }
    }

    #[test]
    fn test_parse_add_wrong_types() {
        assert!(parse_add(&json!({"id": 7, "vector": [1.0]})).is_err());
        assert!(parse_add(&json!({"id": "a", "vector": "1,2"})).is_err());
        assert!(parse_add(&json!({"id": "a", "vector": [1.0, "x"]})).is_err());
        assert!(parse_add(&json!({"id": "a", "vector": [1.0], "metadata": [1]})).is_err());
    }

    #[test]
    fn test_parse_add_metadata_defaults() {
        let req = parse_add(&json!({"id": "a", "vector": [1.0], "metadata": null})).unwrap();
        assert!(req.metadata.is_empty());
    }

    #[test]
    fn test_parse_search_default_k() {
        let req = parse_search(&json!({"vector": [1.0, 2.0]})).unwrap();
        assert_eq!(req.k, DEFAULT_K);
        assert_eq!(req.vector, vec![1.0, 2.0]);
    }

    #[test]
    fn test_parse_search_rejects_bad_k() {
        for k in [json!(0), json!(-1), json!(2.5), json!("3")] {
            assert!(parse_search(&json!({"vector": [1.0], "k": k})).is_err());
        }
        assert_eq!(parse_search(&json!({"vector": [1.0], "k": 12})).unwrap().k, 12);
    }

    #[test]
    fn test_parse_search_missing_vector() {
        let err = parse_search(&json!({"k": 3})).unwrap_err();
        assert_eq!(err.to_string(), "Missing query vector");
    }
}
