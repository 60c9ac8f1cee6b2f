use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::history::DEFAULT_SESSION;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    pub k: Option<usize>,
    pub use_history: Option<bool>,
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClearRequest {
    pub session_id: Option<String>,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = payload.message.trim().to_string();
    if message.is_empty() {
        return Err(ApiError::BadRequest("No message provided".to_string()));
    }

    let k = payload.k.unwrap_or(state.config.rag.default_k).max(1);
    let use_history = payload.use_history.unwrap_or(true);
    let session_id = payload.session_id.as_deref().unwrap_or(DEFAULT_SESSION);

    let session = state.sessions.get_or_create(session_id).await;
    let result = state.engine.answer(&session, &message, k, use_history).await;

    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(result)))
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = params
        .get("session_id")
        .map(String::as_str)
        .unwrap_or(DEFAULT_SESSION);

    let session = state.sessions.get_or_create(session_id).await;
    let session = session.lock().await;
    let history = session.snapshot().to_vec();
    let count = history.len();

    Ok(Json(json!({
        "history": history,
        "count": count,
    })))
}

pub async fn clear_history(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<ClearRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let session_id = payload.session_id.as_deref().unwrap_or(DEFAULT_SESSION);

    let session = state.sessions.get_or_create(session_id).await;
    let mut session = session.lock().await;
    session.clear();

    Ok(Json(json!({
        "success": true,
        "message": "Conversation history cleared",
        "remaining": session.len(),
    })))
}
