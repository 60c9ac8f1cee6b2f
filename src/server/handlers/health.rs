use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// Liveness probe; no dependency on the pipeline or external services.
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "DGMS RAG Chatbot",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
