//! Provider-specific configuration and detection.
//!
//! This module handles differences between LLM API providers, mostly the URL
//! pattern of the chat completions endpoint.

/// Supported LLM providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// `OpenAI` (api.openai.com)
    OpenAI,
    /// Azure `OpenAI` Service
    AzureOpenAI {
        /// Deployment name (required for Azure)
        deployment_name: String,
        /// API version (e.g., "2024-08-01-preview")
        api_version: String,
    },
    /// Hugging Face inference router (router.huggingface.co)
    HuggingFace,
    /// `OpenRouter` (openrouter.ai)
    OpenRouter,
    /// Together AI (together.ai, together.xyz)
    TogetherAI,
    /// Groq (groq.com)
    Groq,
    /// Generic OpenAI-compatible provider
    Generic,
}

impl Provider {
    /// Detect provider from base URL.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rag_chat::llm::Provider;
    ///
    /// let provider = Provider::detect_from_url("https://router.huggingface.co");
    /// assert_eq!(provider, Provider::HuggingFace);
    /// ```
    #[must_use]
    pub fn detect_from_url(base_url: &str) -> Self {
        let lower = base_url.to_lowercase();

        if lower.contains("azure.com") {
            Self::AzureOpenAI {
                deployment_name: String::new(),
                api_version: "2024-08-01-preview".to_string(),
            }
        } else if lower.contains("huggingface.co") {
            Self::HuggingFace
        } else if lower.contains("openrouter.ai") {
            Self::OpenRouter
        } else if lower.contains("together.ai") || lower.contains("together.xyz") {
            Self::TogetherAI
        } else if lower.contains("groq.com") {
            Self::Groq
        } else if lower.contains("openai.com") {
            Self::OpenAI
        } else {
            Self::Generic
        }
    }

    /// Attach an Azure deployment to a detected Azure provider.
    ///
    /// Other providers are returned unchanged.
    #[must_use]
    pub fn with_azure_deployment(self, deployment: Option<String>, version: Option<String>) -> Self {
        match (self, deployment) {
            (Self::AzureOpenAI { api_version, .. }, Some(deployment_name)) => Self::AzureOpenAI {
                deployment_name,
                api_version: version.unwrap_or(api_version),
            },
            (other, _) => other,
        }
    }

    /// Build the chat completions URL for this provider.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL (trailing slash tolerated)
    #[must_use]
    pub fn build_chat_url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');

        match self {
            Self::AzureOpenAI {
                deployment_name,
                api_version,
            } => {
                format!(
                    "{base}/openai/deployments/{deployment_name}/chat/completions?api-version={api_version}"
                )
            }
            _ if base.ends_with("/chat/completions") => base.to_string(),
            _ if base.ends_with("/v1") => format!("{base}/chat/completions"),
            _ => format!("{base}/v1/chat/completions"),
        }
    }
}
