//! Context retrieval: embed the query, look up nearest documents, normalize
//! their shape.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use super::RagError;
use crate::llm::EmbeddingProvider;
use crate::vector::{IndexMatch, VectorIndex};

/// Metadata key the ingest job stores document text under.
const TEXT_KEY: &str = "text";
/// Metadata key for the originating dataset file.
const SOURCE_KEY: &str = "source_file";

/// Document content as a tagged variant instead of a runtime type probe.
///
/// Serialized untagged: JSON responses carry either a plain string or the
/// parsed structure, matching what clients of the original service saw.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DocumentContent {
    Text(String),
    Structured(Value),
}

impl DocumentContent {
    /// Parse-or-fallback: structured payloads are decoded, anything else is
    /// kept verbatim. Never fails; a bad parse just stays `Text`.
    pub fn from_raw(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => DocumentContent::Structured(value),
            Err(_) => DocumentContent::Text(raw.to_string()),
        }
    }
}

/// One retrieved document, scoped to the request that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedDocument {
    pub content: DocumentContent,
    pub source: String,
    /// 1-based similarity rank, best match first.
    pub rank: usize,
    pub metadata: Map<String, Value>,
}

/// Read-only orchestration of embedding + index lookup.
pub struct ContextRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl ContextRetriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Fetch the `k` most relevant documents for `query`, preserving the
    /// index's similarity ordering. Embedding or index failures propagate;
    /// there is no silent empty result.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, RagError> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| RagError::Retrieval(e.to_string()))?;

        let matches = self
            .index
            .query(&vector, k)
            .await
            .map_err(|e| RagError::Retrieval(e.to_string()))?;

        Ok(matches
            .into_iter()
            .enumerate()
            .map(|(i, m)| into_document(m, i + 1))
            .collect())
    }
}

fn into_document(m: IndexMatch, rank: usize) -> RetrievedDocument {
    let raw_text = m
        .metadata
        .get(TEXT_KEY)
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let source = m
        .metadata
        .get(SOURCE_KEY)
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown")
        .to_string();

    RetrievedDocument {
        content: DocumentContent::from_raw(raw_text),
        source,
        rank,
        metadata: m.metadata,
    }
}
