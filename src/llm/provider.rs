use async_trait::async_trait;

use crate::core::errors::ApiError;

/// Turns free text into a fixed-dimension embedding vector.
///
/// The dimensionality is fixed per deployment and must match the vector
/// index's configured dimension.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError>;
}

/// Single-turn text completion over a fully-formed prompt.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ApiError>;
}
