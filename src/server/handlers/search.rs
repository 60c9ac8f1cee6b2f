use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::rag::RagError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    pub k: Option<usize>,
}

/// Raw retrieval without generation, history or session mutation.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let query = payload.query.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::BadRequest("No query provided".to_string()));
    }

    let k = payload.k.unwrap_or(state.config.rag.default_k).max(1);

    let results = state
        .engine
        .search(&query, k)
        .await
        .map_err(|err| match err {
            RagError::EmptyQuery => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        })?;

    let count = results.len();
    Ok(Json(json!({
        "success": true,
        "results": results,
        "query": query,
        "count": count,
    })))
}
