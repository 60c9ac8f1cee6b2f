//! Gemini REST adapter for embeddings and text completion.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{CompletionProvider, EmbeddingProvider};
use crate::core::config::GeminiConfig;
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    completion_model: String,
    embedding_model: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            completion_model: config.completion_model.clone(),
            embedding_model: config.embedding_model.clone(),
            client: Client::new(),
        }
    }

    async fn post_json(&self, url: &str, body: &Value, context: &str) -> Result<Value, ApiError> {
        let res = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Gemini {} error ({}): {}",
                context, status, text
            )));
        }

        res.json().await.map_err(ApiError::internal)
    }

    /// Embed several texts in one request; used by the offline ingest job.
    pub async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let model = format!("models/{}", self.embedding_model);
        let url = format!("{}/{}:batchEmbedContents", self.base_url, model);
        let requests: Vec<Value> = inputs
            .iter()
            .map(|text| {
                json!({
                    "model": model,
                    "content": { "parts": [{ "text": text }] },
                })
            })
            .collect();

        let payload = self
            .post_json(&url, &json!({ "requests": requests }), "batch embed")
            .await?;

        let embeddings = payload["embeddings"]
            .as_array()
            .ok_or_else(|| ApiError::Internal("Gemini batch embed: missing embeddings".into()))?
            .iter()
            .map(parse_embedding_values)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(embeddings)
    }
}

fn parse_embedding_values(value: &Value) -> Result<Vec<f32>, ApiError> {
    let values = value["values"]
        .as_array()
        .ok_or_else(|| ApiError::Internal("Gemini embed: missing values".into()))?;
    Ok(values
        .iter()
        .filter_map(|v| v.as_f64().map(|f| f as f32))
        .collect())
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let url = format!(
            "{}/models/{}:embedContent",
            self.base_url, self.embedding_model
        );
        let body = json!({
            "content": { "parts": [{ "text": text }] },
        });

        let payload = self.post_json(&url, &body, "embed").await?;
        parse_embedding_values(&payload["embedding"])
    }
}

#[async_trait]
impl CompletionProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.completion_model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let payload = self.post_json(&url, &body, "generate").await?;

        let answer = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| ApiError::Internal("Gemini generate: empty candidate".into()))?
            .to_string();

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_embedding_values() {
        let value = serde_json::json!({ "values": [0.25, -1.0, 3.5] });
        let parsed = parse_embedding_values(&value).unwrap();
        assert_eq!(parsed, vec![0.25, -1.0, 3.5]);
    }

    #[test]
    fn missing_values_is_an_error() {
        let value = serde_json::json!({ "no_values": [] });
        assert!(parse_embedding_values(&value).is_err());
    }
}
