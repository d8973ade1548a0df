use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::embedding::validate_embedding;
use crate::error::ProviderError;
use crate::memory::{MemoryRecord, QueryMatch, VectorStore};

/// Process-local vector store scored by cosine similarity.
///
/// Records live as long as the process. Used for local development and as the
/// reference implementation in tests.
#[derive(Debug)]
pub struct InMemoryVectorStore {
    // Insertion order is kept so equal scores rank deterministically.
    records: RwLock<Vec<MemoryRecord>>,
    dimension: usize,
}

impl InMemoryVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            dimension,
        }
    }

    /// Snapshot of every stored record, in insertion order.
    pub async fn records(&self) -> Vec<MemoryRecord> {
        self.records.read().await.clone()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, record: MemoryRecord) -> Result<(), ProviderError> {
        validate_embedding(&record.vector, self.dimension)?;

        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == record.id) {
            tracing::debug!(id = %record.id, "Record already stored, keeping original");
            return Ok(());
        }
        records.push(record);
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, ProviderError> {
        validate_embedding(vector, self.dimension)?;

        let records = self.records.read().await;
        let mut matches: Vec<QueryMatch> = records
            .iter()
            .map(|r| QueryMatch {
                id: r.id.clone(),
                score: Self::cosine_similarity(vector, &r.vector),
                metadata: r.metadata.clone(),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);

        Ok(matches)
    }
}
