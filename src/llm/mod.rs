//! Completion client traits and implementations.
//!
//! This module provides the provider-agnostic [`CompletionClient`] capability
//! consumed by the RAG pipeline, and an `OpenAI` Chat Completions
//! implementation that also covers Hugging Face's router and other
//! OpenAI-compatible hosts.
//!
//! # Example
//!
//! ```rust,ignore
//! use rag_chat::llm::{ChatCompletionsClient, CompletionClient, CompletionParams, LlmSettings, Provider};
//!
//! let settings = LlmSettings {
//!     base_url: "https://router.huggingface.co".to_string(),
//!     api_key: Some("hf_...".to_string()),
//!     model: "meta-llama/Meta-Llama-3-8B-Instruct".to_string(),
//!     provider: Provider::detect_from_url("https://router.huggingface.co"),
//!     timeout: std::time::Duration::from_secs(30),
//! };
//! let client = ChatCompletionsClient::new(settings)?;
//! let text = client.complete("Bonjour", CompletionParams::default()).await?;
//! ```

pub mod chat_completions;
pub mod provider;

pub use chat_completions::ChatCompletionsClient;
pub use provider::Provider;

use std::time::Duration;

use crate::error::ProviderError;

/// LLM connection and model settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Base URL for the LLM API (e.g., `https://api.openai.com`).
    pub base_url: String,
    /// Optional API key for authentication.
    pub api_key: Option<String>,
    /// Model identifier (e.g., `meta-llama/Meta-Llama-3-8B-Instruct`).
    pub model: String,
    /// Provider type (auto-detected from `base_url` if not specified).
    pub provider: Provider,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
}

/// Sampling parameters for a completion call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 512,
        }
    }
}

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message.
    User,
}

/// A message in a chat completion request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    /// Role of the message author.
    pub role: MessageRole,
    /// Text content.
    pub content: String,
}

impl Message {
    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Capability: prompt to generated text.
///
/// Implementations return the raw generated text, which may be empty when the
/// provider produced nothing; substituting a placeholder is the caller's job.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync + std::fmt::Debug {
    /// Generate a completion for a single-user-turn prompt.
    async fn complete(
        &self,
        prompt: &str,
        params: CompletionParams,
    ) -> Result<String, ProviderError>;
}
