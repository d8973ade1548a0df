//! Vector memory store abstraction.
//!
//! The store holds immutable `(id, vector, metadata)` records and answers
//! k-nearest-neighbor queries. Every implementation validates vector
//! dimensions against its configured size on both write and read.
//!
//! # Providers
//!
//! - [`providers::in_memory::InMemoryVectorStore`]: process-local, cosine similarity
//! - [`providers::postgres::PgVectorStore`]: Postgres + pgvector
//! - [`providers::pinecone::PineconeStore`]: Pinecone data plane over HTTP

pub mod providers;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;
use crate::error::ProviderError;

/// Metadata attached to a stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMetadata {
    /// Text the vector was computed from.
    pub text: String,
    /// Creation time. Older records written by other tools may lack it.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Origin tag (e.g. `chat`, or an ingestion batch name).
    #[serde(default)]
    pub source: String,
}

impl MemoryMetadata {
    /// Metadata stamped with the current time.
    pub fn now(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            created_at: Some(Utc::now()),
            source: source.into(),
        }
    }
}

/// A persisted memory entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRecord {
    /// Unique identifier. Never reused for different content.
    pub id: String,
    /// Embedding of `metadata.text` (or of the query that produced it).
    pub vector: Embedding,
    /// Attached metadata.
    pub metadata: MemoryMetadata,
}

/// A similarity match returned by [`VectorStore::query`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMatch {
    /// Record id.
    pub id: String,
    /// Similarity score, higher is closer.
    pub score: f32,
    /// Record metadata.
    pub metadata: MemoryMetadata,
}

/// Capability: durable vector storage with similarity search.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync + std::fmt::Debug {
    /// Dimension every stored and queried vector must have.
    fn dimension(&self) -> usize;

    /// Insert a record, or leave an existing record with the same id untouched.
    async fn upsert(&self, record: MemoryRecord) -> Result<(), ProviderError>;

    /// Return up to `top_k` records ordered by descending similarity.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, ProviderError>;
}
