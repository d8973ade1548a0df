use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::embedding::{EmbeddingClient, validate_embedding};
use crate::error::ProviderError;
use crate::memory::{MemoryMetadata, MemoryRecord, VectorStore};

use super::with_timeout;

/// A block that could not be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestFailure {
    /// Position of the block in the submitted batch.
    pub index: usize,
    pub error: String,
}

/// Outcome of an ingestion batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub injected: usize,
    pub failed: Vec<IngestFailure>,
    pub source: String,
}

/// Loads text blocks into the vector store.
///
/// Unlike the chat path, every failure is reported back per block.
#[derive(Clone)]
pub struct MemoryIngestor {
    embedding: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    default_source: String,
    call_timeout: Duration,
}

impl std::fmt::Debug for MemoryIngestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryIngestor")
            .field("dimension", &self.store.dimension())
            .field("default_source", &self.default_source)
            .finish_non_exhaustive()
    }
}

impl MemoryIngestor {
    pub fn new(
        embedding: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        default_source: impl Into<String>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            embedding,
            store,
            default_source: default_source.into(),
            call_timeout,
        }
    }

    /// Embed and store each block in order.
    ///
    /// Records get ids of the form `<source>-<uuid>`. Blocks that are blank,
    /// fail to embed, or have the wrong dimension are listed in the report.
    pub async fn ingest(&self, blocks: &[String], source: Option<&str>) -> IngestReport {
        let source = source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.default_source.as_str())
            .to_string();

        let mut injected = 0;
        let mut failed = Vec::new();

        for (index, block) in blocks.iter().enumerate() {
            match self.ingest_block(block, &source).await {
                Ok(id) => {
                    tracing::debug!(index, id = %id, "Block stored");
                    injected += 1;
                }
                Err(e) => {
                    tracing::warn!(index, error = %e, "Block rejected");
                    failed.push(IngestFailure {
                        index,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            source = %source,
            injected,
            failed = failed.len(),
            "Memory ingestion finished"
        );

        IngestReport {
            injected,
            failed,
            source,
        }
    }

    async fn ingest_block(&self, block: &str, source: &str) -> Result<String, ProviderError> {
        let text = block.trim();
        if text.is_empty() {
            return Err(ProviderError::Malformed("empty text block".to_string()));
        }

        let vector = with_timeout(self.call_timeout, "embedding", self.embedding.embed(text)).await?;
        validate_embedding(&vector, self.store.dimension())?;

        let id = format!("{source}-{}", Uuid::new_v4());
        let record = MemoryRecord {
            id: id.clone(),
            vector,
            metadata: MemoryMetadata::now(text, source),
        };
        with_timeout(self.call_timeout, "persistence", self.store.upsert(record)).await?;
        Ok(id)
    }
}
