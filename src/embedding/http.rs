//! HTTP embedding client.
//!
//! Speaks two request dialects, picked from the configured URL:
//!
//! - Hugging Face inference / router feature-extraction: `POST <url>` with `{"inputs": text}`
//! - OpenAI-compatible: `POST <base>/v1/embeddings` with `{"model": .., "input": text}`
//!
//! Responses are parsed leniently because hosted APIs disagree on the shape;
//! see [`parse_embedding`].

use std::time::Duration;

use serde_json::Value;

use crate::error::ProviderError;

use super::{Embedding, EmbeddingClient};

/// Request dialect of an embedding endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingApi {
    /// Hugging Face inference API or router (`{"inputs": ..}`).
    HuggingFace,
    /// OpenAI-compatible `/v1/embeddings` (`{"model": .., "input": ..}`).
    OpenAi,
}

impl EmbeddingApi {
    /// Detect the dialect from the endpoint URL.
    ///
    /// A path ending in `/embeddings` is OpenAI-compatible on any host.
    #[must_use]
    pub fn detect_from_url(url: &str) -> Self {
        let lower = url.to_lowercase();
        let path = lower.split(['?', '#']).next().unwrap_or_default();
        if path.trim_end_matches('/').ends_with("/embeddings") {
            Self::OpenAi
        } else if lower.contains("huggingface.co") || lower.contains("/pipeline/feature-extraction") {
            Self::HuggingFace
        } else {
            Self::OpenAi
        }
    }

    /// Build the request URL for this dialect.
    #[must_use]
    pub fn build_url(self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            Self::HuggingFace => base.to_string(),
            Self::OpenAi if base.ends_with("/embeddings") => base.to_string(),
            Self::OpenAi if base.ends_with("/v1") => format!("{base}/embeddings"),
            Self::OpenAi => format!("{base}/v1/embeddings"),
        }
    }
}

/// Connection settings for [`HttpEmbeddingClient`].
#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    /// Endpoint URL (full URL for Hugging Face, base URL for OpenAI-compatible).
    pub url: String,
    /// Bearer token.
    pub api_key: Option<String>,
    /// Model identifier (sent in the body for OpenAI-compatible endpoints).
    pub model: String,
    /// Request dialect.
    pub api: EmbeddingApi,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
}

/// Embedding client over HTTP.
#[derive(Clone)]
pub struct HttpEmbeddingClient {
    http: reqwest::Client,
    settings: EmbeddingSettings,
}

impl std::fmt::Debug for HttpEmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbeddingClient")
            .field("url", &self.settings.url)
            .field("model", &self.settings.model)
            .field("api", &self.settings.api)
            .finish_non_exhaustive()
    }
}

impl HttpEmbeddingClient {
    /// Create a client with the given settings.
    pub fn new(settings: EmbeddingSettings) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ProviderError::Config(e.to_string()))?;
        Ok(Self { http, settings })
    }

    fn request_body(&self, text: &str) -> Value {
        match self.settings.api {
            EmbeddingApi::HuggingFace => serde_json::json!({ "inputs": text }),
            EmbeddingApi::OpenAi => serde_json::json!({
                "model": self.settings.model,
                "input": text,
            }),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        let url = self.settings.api.build_url(&self.settings.url);

        tracing::debug!(url = %url, text_length = text.len(), "Requesting embedding");

        let mut rb = self.http.post(&url).json(&self.request_body(text));
        if let Some(k) = &self.settings.api_key {
            rb = rb.bearer_auth(k);
        }

        let resp = rb.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        let body: Value = resp.json().await?;
        let embedding = parse_embedding(&body)?;

        tracing::debug!(dimension = embedding.len(), "Embedding received");
        Ok(embedding)
    }
}

/// Extract a single embedding from any of the response shapes seen in the wild:
///
/// - `{"embedding": [..]}`
/// - `{"data": [{"embedding": [..]}]}`
/// - `[{"embedding": [..]}]`
/// - `[..]` (feature-extraction, pooled)
/// - `[[..]]` (feature-extraction, batched)
pub fn parse_embedding(body: &Value) -> Result<Embedding, ProviderError> {
    if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
        let detail = err
            .as_str()
            .map_or_else(|| err.to_string(), ToString::to_string);
        return Err(ProviderError::Payload(detail));
    }

    let raw = match body {
        Value::Object(map) => {
            if let Some(v) = map.get("embedding") {
                v
            } else if let Some(first) = map
                .get("data")
                .and_then(Value::as_array)
                .and_then(|d| d.first())
            {
                first.get("embedding").ok_or_else(|| {
                    ProviderError::Malformed("data[0] has no embedding".to_string())
                })?
            } else {
                return Err(ProviderError::Malformed(
                    "no embedding field in response".to_string(),
                ));
            }
        }
        Value::Array(items) => match items.first() {
            Some(Value::Number(_)) => body,
            Some(Value::Array(_)) => &items[0],
            Some(first @ Value::Object(_)) => first.get("embedding").ok_or_else(|| {
                ProviderError::Malformed("[0] has no embedding".to_string())
            })?,
            _ => {
                return Err(ProviderError::Malformed(
                    "empty or unrecognized embedding array".to_string(),
                ));
            }
        },
        other => {
            return Err(ProviderError::Malformed(format!(
                "unexpected response type: {other}"
            )));
        }
    };

    to_vector(raw)
}

fn to_vector(raw: &Value) -> Result<Embedding, ProviderError> {
    let arr = raw
        .as_array()
        .ok_or_else(|| ProviderError::Malformed("embedding is not an array".to_string()))?;
    if arr.is_empty() {
        return Err(ProviderError::Malformed("embedding is empty".to_string()));
    }

    arr.iter()
        .enumerate()
        .map(|(i, v)| {
            let value = v.as_f64().map(|f| f as f32);
            match value {
                Some(f) if f.is_finite() => Ok(f),
                _ => Err(ProviderError::Malformed(format!(
                    "embedding value at index {i} is not a finite number"
                ))),
            }
        })
        .collect()
}
