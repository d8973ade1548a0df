//! OpenAI Chat Completions API client.
//!
//! This module implements [`CompletionClient`] for the Chat Completions API
//! (`/v1/chat/completions`) in non-streaming mode. The prompt is sent as a
//! single user turn.

use serde_json::Value;

use crate::error::ProviderError;

use super::{CompletionClient, CompletionParams, LlmSettings, Message, Provider};

/// Client for the OpenAI Chat Completions API and compatible hosts.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .field("provider", &self.settings.provider)
            .finish_non_exhaustive()
    }
}

impl ChatCompletionsClient {
    /// Create a new Chat Completions client with the given settings.
    pub fn new(settings: LlmSettings) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ProviderError::Config(e.to_string()))?;
        Ok(Self { http, settings })
    }
}

#[async_trait::async_trait]
impl CompletionClient for ChatCompletionsClient {
    async fn complete(
        &self,
        prompt: &str,
        params: CompletionParams,
    ) -> Result<String, ProviderError> {
        let url = self.settings.provider.build_chat_url(&self.settings.base_url);

        let body = serde_json::json!({
            "model": self.settings.model,
            "stream": false,
            "messages": [Message::user(prompt)],
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        });

        tracing::debug!(
            url = %url,
            model = %self.settings.model,
            prompt_length = prompt.len(),
            "Sending chat completion request"
        );

        let mut rb = self.http.post(&url).json(&body);
        if let Some(k) = &self.settings.api_key {
            rb = match self.settings.provider {
                Provider::AzureOpenAI { .. } => rb.header("api-key", k),
                _ => rb.bearer_auth(k),
            };
        }

        let resp = rb.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            tracing::warn!(status = %status, detail = %detail, "Chat completion rejected");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        let v: Value = resp.json().await?;
        extract_text(&v)
    }
}

/// Pull the assistant text out of a chat completion body.
///
/// Returns an empty string when the body has no content; an `error` field in a
/// 2xx body is reported as [`ProviderError::Payload`].
pub fn extract_text(v: &Value) -> Result<String, ProviderError> {
    if let Some(err) = v.get("error").filter(|e| !e.is_null()) {
        return Err(ProviderError::Payload(err.to_string()));
    }

    let text = v["choices"][0]["message"]["content"]
        .as_str()
        .or_else(|| v["choices"][0]["text"].as_str())
        .unwrap_or_default();

    Ok(text.to_string())
}
