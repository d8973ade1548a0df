use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::embedding::validate_embedding;
use crate::error::ProviderError;
use crate::memory::{MemoryMetadata, MemoryRecord, QueryMatch, VectorStore};

/// Postgres + pgvector backed store.
///
/// Records live in the `memories` table; the vector column is sized to the
/// configured dimension when the table is first created.
#[derive(Debug)]
pub struct PgVectorStore {
    pool: PgPool,
    dimension: usize,
}

impl PgVectorStore {
    pub async fn new(connection_string: &str, dimension: usize) -> Result<Self, ProviderError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await?;

        let store = Self { pool, dimension };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), ProviderError> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;

        // Dimension comes from validated config, not user input.
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMPTZ,
                embedding vector({}) NOT NULL
            )
            "#,
            self.dimension
        );
        sqlx::query(&ddl).execute(&self.pool).await?;

        tracing::info!(dimension = self.dimension, "Postgres memory schema ready");
        Ok(())
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, record: MemoryRecord) -> Result<(), ProviderError> {
        validate_embedding(&record.vector, self.dimension)?;
        let embedding_vector = Vector::from(record.vector);

        // Records are immutable: a retry with the same id is a no-op.
        sqlx::query(
            r#"
            INSERT INTO memories (id, text, source, created_at, embedding)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&record.id)
        .bind(&record.metadata.text)
        .bind(&record.metadata.source)
        .bind(record.metadata.created_at)
        .bind(embedding_vector)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, ProviderError> {
        validate_embedding(vector, self.dimension)?;
        let embedding_vector = Vector::from(vector.to_vec());
        let limit_i64 = i64::try_from(top_k).unwrap_or(i64::MAX);

        let rows = sqlx::query(
            r#"
            SELECT id, text, source, created_at, 1 - (embedding <=> $1) AS score
            FROM memories
            ORDER BY embedding <=> $1
            LIMIT $2
            "#,
        )
        .bind(embedding_vector)
        .bind(limit_i64)
        .fetch_all(&self.pool)
        .await?;

        let mut matches = Vec::with_capacity(rows.len());
        for row in rows {
            let created_at: Option<chrono::DateTime<chrono::Utc>> = row.try_get("created_at")?;
            // pgvector distance operators return double precision.
            let score: f64 = row.try_get("score")?;

            matches.push(QueryMatch {
                id: row.try_get("id")?,
                score: score as f32,
                metadata: MemoryMetadata {
                    text: row.try_get("text")?,
                    created_at,
                    source: row.try_get("source")?,
                },
            });
        }
        Ok(matches)
    }
}
