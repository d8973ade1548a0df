//! RAG request orchestration.
//!
//! One call to [`RagOrchestrator::handle`] runs the whole pipeline for a
//! single message:
//! 1. Validate the message
//! 2. Embed it (failure degrades to an empty context)
//! 3. Retrieve the nearest records (failure degrades to an empty context)
//! 4. Compose the augmented prompt
//! 5. Obtain a completion (the only failure surfaced to the caller)
//! 6. Persist `"<message> | <answer>"` when an embedding is available
//!
//! Provider clients are injected at construction and shared across requests.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::embedding::{Embedding, EmbeddingClient, validate_embedding};
use crate::error::{OrchestratorError, ProviderError};
use crate::llm::{CompletionClient, CompletionParams};
use crate::memory::{MemoryMetadata, MemoryRecord, VectorStore};

use super::prompt::PromptComposer;
use super::with_timeout;

/// Answer text used when the model returns nothing.
pub const DEFAULT_FALLBACK_TEXT: &str = "🤖 Pas de réponse du modèle.";

/// Message returned for an empty or missing user message.
pub const EMPTY_MESSAGE: &str = "Message vide";

/// When the interaction record is written relative to the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistMode {
    /// Spawned after the answer is ready; the response never waits on it.
    #[default]
    Background,
    /// Awaited before responding. Failures are still swallowed.
    Inline,
}

/// Pipeline policy.
#[derive(Debug, Clone)]
pub struct RagSettings {
    /// Number of context snippets retrieved per request.
    pub top_k: usize,
    pub params: CompletionParams,
    pub fallback_text: String,
    /// `source` written into persisted chat records.
    pub source: String,
    pub persist_mode: PersistMode,
    /// Budget for each individual provider call.
    pub call_timeout: Duration,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            params: CompletionParams::default(),
            fallback_text: DEFAULT_FALLBACK_TEXT.to_string(),
            source: "chat".to_string(),
            persist_mode: PersistMode::Background,
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Successful pipeline result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub text: String,
}

/// The RAG pipeline.
#[derive(Clone)]
pub struct RagOrchestrator {
    embedding: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    completion: Arc<dyn CompletionClient>,
    composer: PromptComposer,
    settings: RagSettings,
}

impl std::fmt::Debug for RagOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagOrchestrator")
            .field("embedding", &self.embedding)
            .field("store", &self.store)
            .field("completion", &self.completion)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl RagOrchestrator {
    pub fn new(
        embedding: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        completion: Arc<dyn CompletionClient>,
        composer: PromptComposer,
        settings: RagSettings,
    ) -> Self {
        Self {
            embedding,
            store,
            completion,
            composer,
            settings,
        }
    }

    /// Answer one user message.
    pub async fn handle(&self, message: &str) -> Result<ChatAnswer, OrchestratorError> {
        if message.trim().is_empty() {
            metrics::counter!("rag_requests_total", "outcome" => "invalid").increment(1);
            return Err(OrchestratorError::InvalidInput(EMPTY_MESSAGE.to_string()));
        }

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("rag.handle", request_id = %request_id);

        let result = self.run(message).instrument(span).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(OrchestratorError::CompletionFailed { .. }) => "completion_failed",
            Err(_) => "error",
        };
        metrics::counter!("rag_requests_total", "outcome" => outcome).increment(1);
        result
    }

    async fn run(&self, message: &str) -> Result<ChatAnswer, OrchestratorError> {
        tracing::debug!(message_length = message.len(), "Handling chat message");

        let embedding = self.embed(message).await;

        let snippets = match &embedding {
            Some(vector) => self.retrieve(vector).await,
            None => Vec::new(),
        };

        let prompt = self.composer.compose(&snippets, message);
        tracing::debug!(
            snippets = snippets.len(),
            prompt_length = prompt.len(),
            "Prompt composed"
        );

        let raw = with_timeout(
            self.settings.call_timeout,
            "completion",
            self.completion.complete(&prompt, self.settings.params),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Completion failed");
            completion_error(e)
        })?;

        let trimmed = raw.trim();
        let answer = if trimmed.is_empty() {
            tracing::info!("Completion returned no text, using fallback");
            self.settings.fallback_text.clone()
        } else {
            trimmed.to_string()
        };

        if let Some(vector) = embedding {
            self.persist(message, &answer, vector).await;
        }

        Ok(ChatAnswer { text: answer })
    }

    async fn embed(&self, message: &str) -> Option<Embedding> {
        let result = with_timeout(
            self.settings.call_timeout,
            "embedding",
            self.embedding.embed(message),
        )
        .await
        .and_then(|v| validate_embedding(&v, self.store.dimension()).map(|()| v));

        match result {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, "Embedding unavailable, continuing without context");
                metrics::counter!("rag_degraded_total", "stage" => "embedding").increment(1);
                None
            }
        }
    }

    async fn retrieve(&self, vector: &[f32]) -> Vec<String> {
        let result = with_timeout(
            self.settings.call_timeout,
            "retrieval",
            self.store.query(vector, self.settings.top_k),
        )
        .await;

        match result {
            Ok(matches) => {
                tracing::debug!(matches = matches.len(), "Context retrieved");
                matches.into_iter().map(|m| m.metadata.text).collect()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Retrieval failed, continuing without context");
                metrics::counter!("rag_degraded_total", "stage" => "retrieval").increment(1);
                Vec::new()
            }
        }
    }

    async fn persist(&self, message: &str, answer: &str, vector: Embedding) {
        let record = MemoryRecord {
            id: format!("{}-{}", self.settings.source, Uuid::new_v4()),
            vector,
            metadata: MemoryMetadata::now(
                format!("{message} | {answer}"),
                self.settings.source.clone(),
            ),
        };

        let store = Arc::clone(&self.store);
        let budget = self.settings.call_timeout;
        match self.settings.persist_mode {
            PersistMode::Inline => write_record(store, record, budget).await,
            PersistMode::Background => {
                tokio::spawn(write_record(store, record, budget).in_current_span());
            }
        }
    }
}

async fn write_record(store: Arc<dyn VectorStore>, record: MemoryRecord, budget: Duration) {
    let id = record.id.clone();
    match with_timeout(budget, "persistence", store.upsert(record)).await {
        Ok(()) => tracing::debug!(id = %id, "Interaction persisted"),
        Err(e) => {
            tracing::warn!(id = %id, error = %e, "Failed to persist interaction");
            metrics::counter!("rag_persist_failures_total").increment(1);
        }
    }
}

/// Map a completion failure to what the caller sees.
///
/// A transport failure means no provider answered at all and is reported as
/// unexpected; every other failure carries the upstream detail.
fn completion_error(err: ProviderError) -> OrchestratorError {
    match err {
        ProviderError::Transport(detail) => OrchestratorError::Unexpected(detail),
        ProviderError::Status { status, detail } => OrchestratorError::CompletionFailed {
            status: Some(status),
            detail,
        },
        other => OrchestratorError::CompletionFailed {
            status: None,
            detail: other.detail(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failure_is_unexpected() {
        let err = completion_error(ProviderError::Transport("connection refused".into()));
        assert!(matches!(err, OrchestratorError::Unexpected(ref d) if d == "connection refused"));
    }

    #[test]
    fn test_status_failure_keeps_status_and_body() {
        let err = completion_error(ProviderError::Status {
            status: 503,
            detail: "loading".into(),
        });
        assert!(matches!(
            err,
            OrchestratorError::CompletionFailed { status: Some(503), ref detail } if detail == "loading"
        ));
    }

    #[test]
    fn test_timeout_is_completion_failure() {
        let err = completion_error(ProviderError::Timeout("completion exceeded 1s".into()));
        assert!(matches!(err, OrchestratorError::CompletionFailed { status: None, .. }));
    }

    #[test]
    fn test_persist_mode_deserializes_lowercase() {
        let mode: PersistMode = serde_json::from_str("\"inline\"").unwrap();
        assert_eq!(mode, PersistMode::Inline);
        assert_eq!(PersistMode::default(), PersistMode::Background);
    }
}
