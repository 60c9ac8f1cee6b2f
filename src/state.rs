use std::sync::Arc;
use std::time::Duration;

use crate::core::config::AppConfig;
use crate::history::SessionStore;
use crate::llm::GeminiClient;
use crate::rag::{ContextRetriever, RagEngine};
use crate::vector::PineconeIndex;

/// Shared application state: the engine plus the session store, wired from
/// validated configuration.
pub struct AppState {
    pub config: AppConfig,
    pub engine: RagEngine,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: AppConfig) -> Arc<Self> {
        let gemini = Arc::new(GeminiClient::new(&config.gemini));
        let index = Arc::new(PineconeIndex::new(&config.pinecone));

        let retriever = ContextRetriever::new(gemini.clone(), index);
        let stage_timeout = match config.rag.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let engine = RagEngine::new(retriever, gemini, stage_timeout);

        Arc::new(Self {
            config,
            engine,
            sessions: SessionStore::new(),
        })
    }
}
