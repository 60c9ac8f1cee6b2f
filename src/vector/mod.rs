//! Vector index abstraction.
//!
//! The pipeline only depends on nearest-neighbor lookup; the Pinecone
//! adapter in `pinecone` is the deployed implementation.

pub mod pinecone;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::errors::ApiError;

pub use pinecone::PineconeIndex;

/// One nearest-neighbor match as reported by the index, most relevant first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMatch {
    pub id: String,
    /// Similarity score under the index's configured metric (cosine here).
    pub score: f32,
    /// Stored metadata; document text travels under `"text"`, the origin
    /// file under `"source_file"` (ingest convention).
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `k` nearest neighbors of `vector`, best match first.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexMatch>, ApiError>;
}
