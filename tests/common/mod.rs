//! Hand-written provider fakes shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use rag_chat::embedding::{Embedding, EmbeddingClient};
use rag_chat::error::ProviderError;
use rag_chat::llm::{CompletionClient, CompletionParams};
use rag_chat::memory::{MemoryMetadata, MemoryRecord, QueryMatch, VectorStore};
use rag_chat::rag::{MemoryIngestor, PersistMode, PromptComposer, RagOrchestrator, RagSettings};

pub const DIM: usize = 4;

#[derive(Debug, Clone)]
pub enum EmbedBehavior {
    Vector(Embedding),
    Transport(String),
    Status(u16, String),
    Hang,
}

#[derive(Debug)]
pub struct FakeEmbedding {
    behavior: EmbedBehavior,
    pub calls: AtomicUsize,
}

impl FakeEmbedding {
    pub fn new(behavior: EmbedBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn ok() -> Arc<Self> {
        Self::new(EmbedBehavior::Vector(vec![0.1, 0.2, 0.3, 0.4]))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingClient for FakeEmbedding {
    async fn embed(&self, _text: &str) -> Result<Embedding, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            EmbedBehavior::Vector(v) => Ok(v.clone()),
            EmbedBehavior::Transport(d) => Err(ProviderError::Transport(d.clone())),
            EmbedBehavior::Status(s, d) => Err(ProviderError::Status {
                status: *s,
                detail: d.clone(),
            }),
            EmbedBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError::Transport("unreachable".into()))
            }
        }
    }
}

#[derive(Debug)]
pub struct FakeStore {
    pub dimension: usize,
    /// Texts returned by `query`, highest score first.
    pub snippets: Vec<String>,
    pub fail_query: bool,
    pub fail_upsert: bool,
    pub queries: AtomicUsize,
    pub upserts: Mutex<Vec<MemoryRecord>>,
    pub upserted: Notify,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self {
            dimension: DIM,
            snippets: Vec::new(),
            fail_query: false,
            fail_upsert: false,
            queries: AtomicUsize::new(0),
            upserts: Mutex::new(Vec::new()),
            upserted: Notify::new(),
        }
    }
}

impl FakeStore {
    pub fn with_dimension(dimension: usize, snippets: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            dimension,
            snippets: snippets.iter().map(ToString::to_string).collect(),
            ..Self::default()
        })
    }

    pub fn with_snippets(snippets: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            snippets: snippets.iter().map(ToString::to_string).collect(),
            ..Self::default()
        })
    }

    pub fn failing_query() -> Arc<Self> {
        Arc::new(Self {
            fail_query: true,
            ..Self::default()
        })
    }

    pub fn failing_upsert() -> Arc<Self> {
        Arc::new(Self {
            fail_upsert: true,
            ..Self::default()
        })
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<MemoryRecord> {
        self.upserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorStore for FakeStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, record: MemoryRecord) -> Result<(), ProviderError> {
        let result = if self.fail_upsert {
            Err(ProviderError::Transport("store offline".into()))
        } else {
            self.upserts.lock().unwrap().push(record);
            Ok(())
        };
        self.upserted.notify_one();
        result
    }

    async fn query(&self, _vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, ProviderError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_query {
            return Err(ProviderError::Status {
                status: 503,
                detail: "index unavailable".into(),
            });
        }
        Ok(self
            .snippets
            .iter()
            .take(top_k)
            .enumerate()
            .map(|(i, text)| QueryMatch {
                id: format!("m{i}"),
                score: 1.0 - i as f32 * 0.1,
                metadata: MemoryMetadata {
                    text: text.clone(),
                    created_at: Some(Utc::now()),
                    source: "test".into(),
                },
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
pub enum CompleteBehavior {
    Reply(String),
    Status(u16, String),
    Payload(String),
    Transport(String),
    Hang,
}

#[derive(Debug)]
pub struct FakeCompletion {
    behavior: CompleteBehavior,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeCompletion {
    pub fn new(behavior: CompleteBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn reply(text: &str) -> Arc<Self> {
        Self::new(CompleteBehavior::Reply(text.to_string()))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for FakeCompletion {
    async fn complete(
        &self,
        prompt: &str,
        _params: CompletionParams,
    ) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.behavior {
            CompleteBehavior::Reply(t) => Ok(t.clone()),
            CompleteBehavior::Status(s, d) => Err(ProviderError::Status {
                status: *s,
                detail: d.clone(),
            }),
            CompleteBehavior::Payload(d) => Err(ProviderError::Payload(d.clone())),
            CompleteBehavior::Transport(d) => Err(ProviderError::Transport(d.clone())),
            CompleteBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
        }
    }
}

pub fn settings(persist_mode: PersistMode) -> RagSettings {
    RagSettings {
        top_k: 3,
        persist_mode,
        call_timeout: Duration::from_millis(200),
        ..RagSettings::default()
    }
}

/// Template that makes context and message easy to assert on.
pub const TEST_TEMPLATE: &str = "CTX[{context}] MSG[{message}]";

pub fn orchestrator(
    embedding: Arc<FakeEmbedding>,
    store: Arc<FakeStore>,
    completion: Arc<FakeCompletion>,
) -> RagOrchestrator {
    RagOrchestrator::new(
        embedding,
        store,
        completion,
        PromptComposer::new(TEST_TEMPLATE),
        settings(PersistMode::Inline),
    )
}

pub fn ingestor(embedding: Arc<FakeEmbedding>, store: Arc<FakeStore>) -> MemoryIngestor {
    MemoryIngestor::new(embedding, store, "docs", Duration::from_millis(200))
}
