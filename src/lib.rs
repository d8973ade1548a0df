//! Retrieval-augmented chat service.
//!
//! Answers a user message by embedding it, retrieving related records from a
//! vector memory, asking a language model with that context, and storing the
//! exchange back into memory.
//!
//! # Architecture
//!
//! - **Server**: Axum-based HTTP server
//! - **RAG pipeline**: orchestrator over injected provider capabilities
//! - **Providers**: HTTP embedding client, Chat Completions client, vector stores
//!
//! # Modules
//!
//! - [`rag`]: orchestrator, prompt composer and ingestion
//! - [`embedding`]: embedding capability and HTTP adapter
//! - [`llm`]: completion capability and Chat Completions adapter
//! - [`memory`]: vector store capability and providers
//! - [`api`]: HTTP handlers

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod api;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod memory;
pub mod rag;
pub mod server;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use embedding::EmbeddingClient;
use metrics_exporter_prometheus::PrometheusHandle;
use rag::{MemoryIngestor, RagOrchestrator};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// RAG pipeline for chat requests.
    pub orchestrator: Arc<RagOrchestrator>,
    /// Bulk loader behind `/api/memory`.
    pub ingestor: Arc<MemoryIngestor>,
    /// Embedding client, probed by the diagnostics endpoint.
    pub embedding: Arc<dyn EmbeddingClient>,
    /// Configured embedding dimension.
    pub dimension: usize,
    /// Budget for a single provider call.
    pub call_timeout: Duration,
    /// Prometheus handle, present when the recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("orchestrator", &self.orchestrator)
            .field("dimension", &self.dimension)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
