//! The RAG orchestrator.
//!
//! `answer()` runs the full pipeline: validate → retrieve → build prompt →
//! generate → record the turn. The engine boundary is the single place where
//! stage failures are normalized into a `GenerationResult`; callers always
//! get a structured, query-correlated response.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::prompt::PromptBuilder;
use super::retriever::{ContextRetriever, RetrievedDocument};
use super::RagError;
use crate::history::{ConversationTurn, SharedSession, HISTORY_WINDOW};
use crate::llm::CompletionProvider;

/// Outcome of one `answer()` call. Exactly one of `answer`/`error` is set;
/// on failure `sources` is empty.
#[derive(Debug, Serialize)]
pub struct GenerationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub sources: Vec<RetrievedDocument>,
    pub query: String,
    pub num_sources: usize,
}

impl GenerationResult {
    fn completed(query: String, answer: String, sources: Vec<RetrievedDocument>) -> Self {
        Self {
            success: true,
            answer: Some(answer),
            error: None,
            num_sources: sources.len(),
            sources,
            query,
        }
    }

    fn failed(query: String, error: &RagError) -> Self {
        Self {
            success: false,
            answer: None,
            error: Some(error.to_string()),
            sources: Vec::new(),
            query,
            num_sources: 0,
        }
    }
}

pub struct RagEngine {
    retriever: ContextRetriever,
    completion: Arc<dyn CompletionProvider>,
    prompt: PromptBuilder,
    /// Per-stage deadline for external calls; `None` disables it.
    stage_timeout: Option<Duration>,
}

impl RagEngine {
    pub fn new(
        retriever: ContextRetriever,
        completion: Arc<dyn CompletionProvider>,
        stage_timeout: Option<Duration>,
    ) -> Self {
        Self {
            retriever,
            completion,
            prompt: PromptBuilder::new(),
            stage_timeout,
        }
    }

    /// Answer `query` against the given session.
    ///
    /// The session lock is held for the whole call, so concurrent answers on
    /// one session serialize; distinct sessions proceed independently. The
    /// turn is recorded only when the whole pipeline succeeded, and recording
    /// is independent of `use_history` (which only controls whether the
    /// history window is injected into the prompt).
    pub async fn answer(
        &self,
        session: &SharedSession,
        query: &str,
        k: usize,
        use_history: bool,
    ) -> GenerationResult {
        let query = query.trim().to_string();
        let mut session = session.lock().await;

        let outcome = async {
            if query.is_empty() {
                return Err(RagError::EmptyQuery);
            }

            let sources = self.retrieve_bounded(&query, k.max(1)).await?;

            let history = if use_history {
                Some(session.recent(HISTORY_WINDOW).to_vec())
            } else {
                None
            };
            let prompt = self.prompt.build(&query, &sources, history.as_deref());

            let answer = self
                .run_stage("generation", self.completion.generate(&prompt))
                .await
                .map_err(RagError::Generation)?;

            Ok((answer, sources))
        }
        .await;

        match outcome {
            Ok((answer, sources)) => {
                session.append(ConversationTurn {
                    user: query.clone(),
                    assistant: answer.clone(),
                });
                tracing::info!(sources = sources.len(), "answered query");
                GenerationResult::completed(query, answer, sources)
            }
            Err(err) => {
                tracing::warn!("pipeline failed: {err}");
                GenerationResult::failed(query, &err)
            }
        }
    }

    /// Context-only mode: retrieval without generation or session mutation.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, RagError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::EmptyQuery);
        }
        self.retrieve_bounded(query, k.max(1)).await
    }

    async fn retrieve_bounded(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, RagError> {
        match self.stage_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.retriever.retrieve(query, k))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(RagError::Retrieval(timeout_message("retrieval", limit))),
            },
            None => self.retriever.retrieve(query, k).await,
        }
    }

    async fn run_stage<T, F>(&self, stage: &str, fut: F) -> Result<T, String>
    where
        F: Future<Output = Result<T, crate::core::errors::ApiError>>,
    {
        match self.stage_timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(_) => Err(timeout_message(stage, limit)),
            },
            None => fut.await.map_err(|e| e.to_string()),
        }
    }
}

fn timeout_message(stage: &str, limit: Duration) -> String {
    format!("{} timed out after {}s", stage, limit.as_secs_f32())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use tokio::sync::Mutex;

    use crate::core::errors::ApiError;
    use crate::history::ConversationSession;
    use crate::llm::EmbeddingProvider;
    use crate::vector::{IndexMatch, VectorIndex};

    struct CountingEmbedder {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0.0; 8])
        }
    }

    struct FixedIndex {
        matches: Vec<IndexMatch>,
    }

    #[async_trait]
    impl VectorIndex for FixedIndex {
        async fn query(&self, _vector: &[f32], k: usize) -> Result<Vec<IndexMatch>, ApiError> {
            Ok(self.matches.iter().take(k).cloned().collect())
        }
    }

    struct EchoCompletion {
        reply: String,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl CompletionProvider for EchoCompletion {
        async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
            self.prompts.lock().await.push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    struct FailingCompletion;

    #[async_trait]
    impl CompletionProvider for FailingCompletion {
        async fn generate(&self, _prompt: &str) -> Result<String, ApiError> {
            Err(ApiError::Internal("quota exceeded".to_string()))
        }
    }

    struct HangingCompletion;

    #[async_trait]
    impl CompletionProvider for HangingCompletion {
        async fn generate(&self, _prompt: &str) -> Result<String, ApiError> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    fn index_match(text: &str, source: &str, score: f32) -> IndexMatch {
        let mut metadata = Map::new();
        metadata.insert("text".to_string(), json!(text));
        metadata.insert("source_file".to_string(), json!(source));
        IndexMatch {
            id: source.to_string(),
            score,
            metadata,
        }
    }

    fn two_code_matches() -> Vec<IndexMatch> {
        vec![
            index_match("Code 1.1: Roof fall", "a.json", 0.95),
            index_match("Code 1.2: Gas explosion", "b.json", 0.82),
        ]
    }

    struct Harness {
        engine: RagEngine,
        session: SharedSession,
        embed_calls: Arc<AtomicUsize>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    fn harness(completion: Arc<dyn CompletionProvider>, timeout: Option<Duration>) -> Harness {
        let embed_calls = Arc::new(AtomicUsize::new(0));
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let retriever = ContextRetriever::new(
            Arc::new(CountingEmbedder {
                calls: embed_calls.clone(),
            }),
            Arc::new(FixedIndex {
                matches: two_code_matches(),
            }),
        );
        Harness {
            engine: RagEngine::new(retriever, completion, timeout),
            session: Arc::new(Mutex::new(ConversationSession::new())),
            embed_calls,
            prompts,
        }
    }

    fn echo_harness(reply: &str) -> Harness {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let mut h = harness(
            Arc::new(EchoCompletion {
                reply: reply.to_string(),
                prompts: prompts.clone(),
            }),
            None,
        );
        h.prompts = prompts;
        h
    }

    #[tokio::test]
    async fn successful_answer_records_one_turn() {
        let h = echo_harness("Code 1.1 refers to roof fall incidents.");

        let result = h
            .engine
            .answer(&h.session, "What does code 1.1 mean?", 2, true)
            .await;

        assert!(result.success);
        assert_eq!(
            result.answer.as_deref(),
            Some("Code 1.1 refers to roof fall incidents.")
        );
        assert_eq!(result.query, "What does code 1.1 mean?");
        assert_eq!(result.num_sources, 2);
        assert_eq!(result.sources[0].source, "a.json");
        assert_eq!(result.sources[1].source, "b.json");

        let session = h.session.lock().await;
        assert_eq!(session.len(), 1);
        assert_eq!(session.snapshot()[0].user, "What does code 1.1 mean?");
        assert_eq!(
            session.snapshot()[0].assistant,
            "Code 1.1 refers to roof fall incidents."
        );
    }

    #[tokio::test]
    async fn empty_query_is_rejected_before_any_external_call() {
        let h = echo_harness("unused");

        let result = h.engine.answer(&h.session, "   ", 2, true).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No message provided"));
        assert_eq!(h.embed_calls.load(Ordering::SeqCst), 0);
        assert!(h.session.lock().await.is_empty());
    }

    #[tokio::test]
    async fn generation_failure_leaves_session_unchanged_and_sources_empty() {
        let h = harness(Arc::new(FailingCompletion), None);

        let result = h.engine.answer(&h.session, "query", 2, true).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("quota exceeded"));
        assert!(result.sources.is_empty());
        assert_eq!(result.num_sources, 0);
        assert!(h.session.lock().await.is_empty());
    }

    #[tokio::test]
    async fn generation_timeout_is_surfaced_not_hung() {
        let h = harness(
            Arc::new(HangingCompletion),
            Some(Duration::from_millis(50)),
        );

        let result = h.engine.answer(&h.session, "query", 2, true).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("generation timed out"));
        assert!(result.sources.is_empty());
        assert!(h.session.lock().await.is_empty());
    }

    #[tokio::test]
    async fn use_history_controls_prompt_injection_only() {
        let h = echo_harness("answer");

        h.engine.answer(&h.session, "first question", 2, false).await;
        // Recorded despite use_history = false.
        assert_eq!(h.session.lock().await.len(), 1);

        h.engine.answer(&h.session, "second question", 2, false).await;
        let prompts = h.prompts.lock().await;
        assert!(!prompts[1].contains("Previous conversation:"));
    }

    #[tokio::test]
    async fn history_window_appears_in_prompt_when_enabled() {
        let h = echo_harness("answer");

        h.engine.answer(&h.session, "first question", 2, true).await;
        h.engine.answer(&h.session, "second question", 2, true).await;

        let prompts = h.prompts.lock().await;
        assert!(prompts[1].contains("Previous conversation:"));
        assert!(prompts[1].contains("User: first question"));
    }

    #[tokio::test]
    async fn search_never_touches_the_session() {
        let h = echo_harness("unused");

        let docs = h.engine.search("roof fall", 2).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert!(h.session.lock().await.is_empty());

        let err = h.engine.search("", 2).await.unwrap_err();
        assert!(matches!(err, RagError::EmptyQuery));
    }

    #[tokio::test]
    async fn failure_result_echoes_the_query() {
        let h = harness(Arc::new(FailingCompletion), None);
        let result = h.engine.answer(&h.session, "correlate me", 1, false).await;
        assert_eq!(result.query, "correlate me");
    }

    #[test]
    fn result_serializes_exactly_one_of_answer_or_error() {
        let ok = GenerationResult::completed("q".into(), "a".into(), Vec::new());
        let value: Value = serde_json::to_value(&ok).unwrap();
        assert!(value.get("answer").is_some());
        assert!(value.get("error").is_none());

        let err = GenerationResult::failed("q".into(), &RagError::EmptyQuery);
        let value: Value = serde_json::to_value(&err).unwrap();
        assert!(value.get("answer").is_none());
        assert_eq!(value["error"], "No message provided");
    }
}
