//! Embedding client abstraction.
//!
//! An [`EmbeddingClient`] turns a text into a vector of the deployment's fixed
//! dimension. Adapters report failures as [`ProviderError`]; they never pad,
//! truncate or invent vectors.
//!
//! - [`HttpEmbeddingClient`]: Hugging Face inference / OpenAI-compatible HTTP APIs

pub mod http;

pub use http::{EmbeddingApi, EmbeddingSettings, HttpEmbeddingClient};

use crate::error::ProviderError;

/// A dense embedding vector.
pub type Embedding = Vec<f32>;

/// Capability: text to embedding.
#[async_trait::async_trait]
pub trait EmbeddingClient: Send + Sync + std::fmt::Debug {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError>;
}

/// Check that `vector` holds exactly `expected` finite values.
pub fn validate_embedding(vector: &[f32], expected: usize) -> Result<(), ProviderError> {
    if vector.len() != expected {
        return Err(ProviderError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    if let Some(pos) = vector.iter().position(|v| !v.is_finite()) {
        return Err(ProviderError::Malformed(format!(
            "non-finite value at index {pos}"
        )));
    }
    Ok(())
}
