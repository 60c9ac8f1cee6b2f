//! Offline bulk uploader: loads every `*.json` file from a datasets
//! directory, embeds the raw JSON text and upserts it into the Pinecone
//! index. One vector per file, mirroring what the retrieval side expects:
//! document text under `text`, origin file under `source_file`.
//!
//! Usage: `ingest [datasets-dir]` (defaults to `./datasets`).

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use dgms_rag::core::config::AppConfig;
use dgms_rag::llm::GeminiClient;
use dgms_rag::vector::pinecone::{PineconeIndex, UpsertVector};

const EMBED_BATCH: usize = 16;

struct Dataset {
    filename: String,
    text: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load().context("invalid configuration")?;
    let datasets_dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("datasets"));

    let datasets = load_datasets(&datasets_dir)?;
    if datasets.is_empty() {
        bail!("no JSON files found in {}", datasets_dir.display());
    }
    tracing::info!("loaded {} dataset files", datasets.len());

    let gemini = GeminiClient::new(&config.gemini);
    let index = PineconeIndex::new(&config.pinecone);

    let mut uploaded = 0;
    for (batch_start, batch) in datasets.chunks(EMBED_BATCH).enumerate() {
        let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
        let embeddings = gemini
            .embed_batch(&texts)
            .await
            .map_err(|e| anyhow::anyhow!("embedding batch failed: {e}"))?;
        if embeddings.len() != batch.len() {
            bail!(
                "embedding count mismatch: got {}, expected {}",
                embeddings.len(),
                batch.len()
            );
        }

        let vectors: Vec<UpsertVector> = batch
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (dataset, values))| UpsertVector {
                id: Uuid::new_v4().to_string(),
                values,
                metadata: build_metadata(dataset, batch_start * EMBED_BATCH + i),
            })
            .collect();

        uploaded += index
            .upsert(&vectors)
            .await
            .map_err(|e| anyhow::anyhow!("upsert failed: {e}"))?;
        tracing::info!("upserted {}/{} documents", uploaded, datasets.len());
    }

    tracing::info!("upload complete: {} documents", uploaded);
    Ok(())
}

fn load_datasets(dir: &PathBuf) -> anyhow::Result<Vec<Dataset>> {
    let mut datasets = Vec::new();

    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read datasets dir {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.json")
            .to_string();
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let value: Value = serde_json::from_str(&contents)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;

        // Stored pretty-printed so the retrieval side can re-parse it into
        // structured content.
        let text = serde_json::to_string_pretty(&value).unwrap_or(contents);
        datasets.push(Dataset { filename, text });
    }

    datasets.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(datasets)
}

fn build_metadata(dataset: &Dataset, doc_id: usize) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("text".to_string(), json!(dataset.text));
    metadata.insert("source_file".to_string(), json!(dataset.filename));
    metadata.insert("doc_id".to_string(), json!(doc_id));
    metadata.insert("raw_json".to_string(), json!(true));
    metadata
}
