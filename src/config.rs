use crate::embedding::{EmbeddingApi, EmbeddingSettings};
use crate::llm::{CompletionParams, LlmSettings, Provider};
use crate::memory::providers::pinecone::PineconeSettings;
use crate::rag::orchestrator::{DEFAULT_FALLBACK_TEXT, PersistMode, RagSettings};
use crate::rag::prompt::DEFAULT_TEMPLATE;
use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: Option<bool>,

    /// Disable timeout middleware
    #[arg(long, env = "TIMEOUT_DISABLED")]
    pub timeout_disabled: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub completion: CompletionConfig,
    pub memory: MemoryConfig,
    pub prompt: PromptConfig,
    pub resilience: ResilienceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub log_json: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// `huggingface`, `openai`, or unset to detect from the URL.
    pub api: Option<String>,
    pub dimension: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub azure_deployment: Option<String>,
    pub azure_api_version: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MemoryConfig {
    /// `memory`, `postgres` or `pinecone`.
    pub provider: String,
    pub top_k: usize,
    pub source: String,
    pub persist_mode: PersistMode,
    pub database_url: Option<String>,
    pub pinecone: PineconeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PineconeConfig {
    pub api_key: Option<String>,
    pub index_name: Option<String>,
    pub host: Option<String>,
    pub namespace: Option<String>,
    pub control_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromptConfig {
    pub template: String,
    pub fallback_text: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub timeout_disabled: bool,
    pub request_timeout_secs: u64,
    pub provider_timeout_secs: u64,
}

/// Map an unprefixed environment variable onto a config key unless the
/// `RAG_` form of that key is already set.
fn env_fallback(
    builder: config::builder::ConfigBuilder<config::builder::DefaultState>,
    key: &str,
    names: &[&str],
) -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    let prefixed = format!("RAG_{}", key.replace('.', "__").to_uppercase());
    if env::var(&prefixed).is_ok() {
        return Ok(builder);
    }
    match names
        .iter()
        .find_map(|n| env::var(n).ok().filter(|v| !v.trim().is_empty()))
    {
        Some(val) => builder.set_override(key, val),
        None => Ok(builder),
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args).map_err(|e| ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder();

        // 1. Defaults
        builder = builder
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.log_json", false)?
            .set_default(
                "embedding.url",
                "https://router.huggingface.co/hf-inference/models/intfloat/multilingual-e5-large-instruct/pipeline/feature-extraction",
            )?
            .set_default("embedding.model", "intfloat/multilingual-e5-large-instruct")?
            .set_default("embedding.dimension", 1024)?
            .set_default("completion.base_url", "https://router.huggingface.co/v1")?
            .set_default("completion.model", "meta-llama/Meta-Llama-3-8B-Instruct")?
            .set_default("completion.temperature", 0.7)?
            .set_default("completion.max_tokens", 512)?
            .set_default("memory.provider", "memory")?
            .set_default("memory.top_k", 3)?
            .set_default("memory.source", "chat")?
            .set_default("memory.persist_mode", "background")?
            .set_default("memory.pinecone.control_url", "https://api.pinecone.io")?
            .set_default("prompt.template", DEFAULT_TEMPLATE)?
            .set_default("prompt.fallback_text", DEFAULT_FALLBACK_TEXT)?
            .set_default("resilience.timeout_disabled", false)?
            .set_default("resilience.request_timeout_secs", 150)?
            .set_default("resilience.provider_timeout_secs", 30)?;

        // 2. Config file: explicit path, else ./config.{yaml,toml,json} when present
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // 3. Environment variables prefixed with RAG_, e.g. RAG_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("RAG")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. Well-known provider variables
        builder = env_fallback(builder, "embedding.api_key", &["HUGGINGFACE_API_KEY"])?;
        builder = env_fallback(
            builder,
            "completion.api_key",
            &["LLM_API_KEY", "HUGGINGFACE_API_KEY"],
        )?;
        builder = env_fallback(builder, "completion.base_url", &["LLM_BASE_URL"])?;
        builder = env_fallback(builder, "completion.model", &["LLM_MODEL"])?;
        builder = env_fallback(builder, "memory.database_url", &["DATABASE_URL"])?;
        builder = env_fallback(builder, "memory.pinecone.api_key", &["PINECONE_API_KEY"])?;
        builder = env_fallback(
            builder,
            "memory.pinecone.index_name",
            &["PINECONE_INDEX_NAME"],
        )?;

        // 5. CLI flags (and their env aliases)
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("server.log_json", json)?;
        }
        if let Some(td) = cli.timeout_disabled {
            builder = builder.set_override("resilience.timeout_disabled", td)?;
        }

        let cfg = builder.build()?;
        let config: Self = cfg.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding.dimension == 0 {
            return Err(ConfigError::Message(
                "embedding.dimension must be greater than 0".to_string(),
            ));
        }
        if self.memory.top_k == 0 {
            return Err(ConfigError::Message(
                "memory.top_k must be greater than 0".to_string(),
            ));
        }
        if !self.completion.temperature.is_finite() || self.completion.temperature < 0.0 {
            return Err(ConfigError::Message(
                "completion.temperature must be a non-negative number".to_string(),
            ));
        }
        if self.resilience.provider_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "resilience.provider_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if !self.resilience.timeout_disabled {
            // Embedding, retrieval and completion run in sequence, plus the
            // write when it is awaited before responding.
            let calls = match self.memory.persist_mode {
                PersistMode::Inline => 4,
                PersistMode::Background => 3,
            };
            let pipeline = self.resilience.provider_timeout_secs.saturating_mul(calls);
            if self.resilience.request_timeout_secs <= pipeline {
                return Err(ConfigError::Message(format!(
                    "resilience.request_timeout_secs ({}) must exceed {calls} provider calls of {}s",
                    self.resilience.request_timeout_secs, self.resilience.provider_timeout_secs
                )));
            }
        }

        for (key, value) in [
            ("embedding.url", &self.embedding.url),
            ("completion.base_url", &self.completion.base_url),
            ("memory.pinecone.control_url", &self.memory.pinecone.control_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| ConfigError::Message(format!("{key} is not a valid URL: {e}")))?;
        }

        if let Some(api) = &self.embedding.api {
            if !matches!(api.to_lowercase().as_str(), "huggingface" | "openai") {
                return Err(ConfigError::Message(format!(
                    "embedding.api must be 'huggingface' or 'openai', got '{api}'"
                )));
            }
        }

        match self.memory.provider.as_str() {
            "memory" => {}
            "postgres" => {
                if self.memory.database_url.is_none() {
                    return Err(ConfigError::Message(
                        "memory.provider 'postgres' requires memory.database_url".to_string(),
                    ));
                }
            }
            "pinecone" => {
                let pc = &self.memory.pinecone;
                if pc.api_key.is_none() {
                    return Err(ConfigError::Message(
                        "memory.provider 'pinecone' requires memory.pinecone.api_key".to_string(),
                    ));
                }
                if pc.host.is_none() && pc.index_name.is_none() {
                    return Err(ConfigError::Message(
                        "memory.provider 'pinecone' requires memory.pinecone.host or index_name"
                            .to_string(),
                    ));
                }
            }
            other => {
                return Err(ConfigError::Message(format!(
                    "unknown memory.provider '{other}'"
                )));
            }
        }
        Ok(())
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.resilience.provider_timeout_secs)
    }

    pub fn embedding_settings(&self) -> EmbeddingSettings {
        let api = match self.embedding.api.as_deref().map(str::to_lowercase).as_deref() {
            Some("huggingface") => EmbeddingApi::HuggingFace,
            Some("openai") => EmbeddingApi::OpenAi,
            _ => EmbeddingApi::detect_from_url(&self.embedding.url),
        };
        EmbeddingSettings {
            url: self.embedding.url.clone(),
            api_key: self.embedding.api_key.clone(),
            model: self.embedding.model.clone(),
            api,
            timeout: self.provider_timeout(),
        }
    }

    pub fn llm_settings(&self) -> LlmSettings {
        let c = &self.completion;
        let provider = Provider::detect_from_url(&c.base_url)
            .with_azure_deployment(c.azure_deployment.clone(), c.azure_api_version.clone());
        LlmSettings {
            base_url: c.base_url.clone(),
            api_key: c.api_key.clone(),
            model: c.model.clone(),
            provider,
            timeout: self.provider_timeout(),
        }
    }

    pub fn pinecone_settings(&self) -> Option<PineconeSettings> {
        let pc = &self.memory.pinecone;
        Some(PineconeSettings {
            api_key: pc.api_key.clone()?,
            host: pc.host.clone(),
            index_name: pc.index_name.clone(),
            namespace: pc.namespace.clone(),
            control_url: pc.control_url.clone(),
            dimension: self.embedding.dimension,
            timeout: self.provider_timeout(),
        })
    }

    pub fn rag_settings(&self) -> RagSettings {
        RagSettings {
            top_k: self.memory.top_k,
            params: CompletionParams {
                temperature: self.completion.temperature,
                max_tokens: self.completion.max_tokens,
            },
            fallback_text: self.prompt.fallback_text.clone(),
            source: self.memory.source.clone(),
            persist_mode: self.memory.persist_mode,
            call_timeout: self.provider_timeout(),
        }
    }
}
