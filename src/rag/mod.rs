//! Retrieval-augmented chat pipeline.
//!
//! - [`RagOrchestrator`]: embed, retrieve, compose, complete, persist
//! - [`PromptComposer`]: pure prompt construction
//! - [`MemoryIngestor`]: bulk loading of text blocks into the vector store

pub mod ingest;
pub mod orchestrator;
pub mod prompt;

pub use ingest::{IngestFailure, IngestReport, MemoryIngestor};
pub use orchestrator::{ChatAnswer, PersistMode, RagOrchestrator, RagSettings};
pub use prompt::PromptComposer;

use std::time::Duration;

use crate::error::ProviderError;

/// Run a provider call under a time budget.
pub(crate) async fn with_timeout<T, F>(
    budget: Duration,
    stage: &'static str,
    call: F,
) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    tokio::time::timeout(budget, call)
        .await
        .unwrap_or_else(|_| Err(ProviderError::Timeout(format!("{stage} exceeded {budget:?}"))))
}
