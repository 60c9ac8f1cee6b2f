//! Pinecone REST adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{IndexMatch, VectorIndex};
use crate::core::config::PineconeConfig;
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct PineconeIndex {
    index_host: String,
    api_key: String,
    client: Client,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

/// One vector to upsert, used by the offline ingest job.
#[derive(Debug, Clone)]
pub struct UpsertVector {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Map<String, Value>,
}

impl PineconeIndex {
    pub fn new(config: &PineconeConfig) -> Self {
        Self {
            index_host: config.index_host.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client: Client::new(),
        }
    }

    async fn post_json(&self, path: &str, body: &Value, context: &str) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.index_host, path);
        let res = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Pinecone {} error ({}): {}",
                context, status, text
            )));
        }

        res.json().await.map_err(ApiError::internal)
    }

    pub async fn upsert(&self, vectors: &[UpsertVector]) -> Result<usize, ApiError> {
        let payload: Vec<Value> = vectors
            .iter()
            .map(|v| {
                json!({
                    "id": v.id,
                    "values": v.values,
                    "metadata": v.metadata,
                })
            })
            .collect();

        let response = self
            .post_json("/vectors/upsert", &json!({ "vectors": payload }), "upsert")
            .await?;

        let count = response["upsertedCount"]
            .as_u64()
            .unwrap_or(vectors.len() as u64);
        Ok(count as usize)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexMatch>, ApiError> {
        let body = json!({
            "vector": vector,
            "topK": k,
            "includeMetadata": true,
        });

        let payload = self.post_json("/query", &body, "query").await?;
        let response: QueryResponse =
            serde_json::from_value(payload).map_err(ApiError::internal)?;

        Ok(response
            .matches
            .into_iter()
            .map(|m| IndexMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_response_tolerates_missing_fields() {
        let payload = serde_json::json!({
            "matches": [
                { "id": "a", "score": 0.92, "metadata": { "text": "Code 1.1" } },
                { "id": "b" }
            ]
        });
        let response: QueryResponse = serde_json::from_value(payload).unwrap();
        assert_eq!(response.matches.len(), 2);
        assert_eq!(response.matches[0].id, "a");
        assert!(response.matches[1].metadata.is_none());
    }
}
