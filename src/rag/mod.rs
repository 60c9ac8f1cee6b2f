//! Retrieval-augmented generation pipeline.
//!
//! - `ContextRetriever`: query embedding → nearest-neighbor lookup → documents
//! - `PromptBuilder`: deterministic prompt rendering
//! - `RagEngine`: the orchestrator tying retrieval, prompting, generation and
//!   conversation history into one `answer()` operation

pub mod engine;
pub mod prompt;
pub mod retriever;

use thiserror::Error;

pub use engine::{GenerationResult, RagEngine};
pub use prompt::PromptBuilder;
pub use retriever::{ContextRetriever, DocumentContent, RetrievedDocument};

/// Failures the pipeline can surface. Every stage error is normalized into a
/// `GenerationResult` at the engine boundary; nothing here escapes to the
/// transport layer as a panic or unhandled fault.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("No message provided")]
    EmptyQuery,
    #[error("retrieval failed: {0}")]
    Retrieval(String),
    #[error("generation failed: {0}")]
    Generation(String),
}
