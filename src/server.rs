use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    middleware::Next,
    response::IntoResponse,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;

use tower_http::trace::TraceLayer;

use tracing::info;

use crate::AppState;
use crate::api;
use crate::config::AppConfig;
use crate::embedding::{EmbeddingClient, HttpEmbeddingClient};
use crate::error::OrchestratorError;
use crate::llm::{ChatCompletionsClient, CompletionClient};
use crate::memory::{
    VectorStore,
    providers::{in_memory::InMemoryVectorStore, pinecone::PineconeStore, postgres::PgVectorStore},
};
use crate::rag::{MemoryIngestor, PromptComposer, RagOrchestrator};

/// Connect the providers named by `config` and wire the pipeline.
pub async fn build_state(
    config: &AppConfig,
    metrics: Option<PrometheusHandle>,
) -> anyhow::Result<AppState> {
    let embedding_settings = config.embedding_settings();
    info!(
        name: "embedding.config.loaded",
        url = %embedding_settings.url,
        model = %embedding_settings.model,
        api = ?embedding_settings.api,
        "Embedding configuration loaded"
    );
    let embedding: Arc<dyn EmbeddingClient> =
        Arc::new(HttpEmbeddingClient::new(embedding_settings)?);

    let llm_settings = config.llm_settings();
    info!(
        name: "llm.config.loaded",
        base_url = %llm_settings.base_url,
        model = %llm_settings.model,
        provider = ?llm_settings.provider,
        "LLM configuration loaded"
    );
    let completion: Arc<dyn CompletionClient> = Arc::new(ChatCompletionsClient::new(llm_settings)?);

    let dimension = config.embedding.dimension;
    let store: Arc<dyn VectorStore> = match config.memory.provider.as_str() {
        "postgres" => {
            let url = config
                .memory
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("memory.database_url is required for postgres"))?;
            info!("Initializing Postgres memory store");
            Arc::new(PgVectorStore::new(url, dimension).await?)
        }
        "pinecone" => {
            let settings = config
                .pinecone_settings()
                .ok_or_else(|| anyhow::anyhow!("memory.pinecone.api_key is required"))?;
            info!("Initializing Pinecone memory store");
            Arc::new(PineconeStore::connect(settings).await?)
        }
        _ => {
            tracing::warn!("Using in-process memory store; records are lost on restart");
            Arc::new(InMemoryVectorStore::new(dimension))
        }
    };

    let orchestrator = RagOrchestrator::new(
        Arc::clone(&embedding),
        Arc::clone(&store),
        completion,
        PromptComposer::new(config.prompt.template.clone()),
        config.rag_settings(),
    );
    let ingestor = MemoryIngestor::new(
        Arc::clone(&embedding),
        store,
        config.memory.source.clone(),
        config.provider_timeout(),
    );

    Ok(AppState {
        orchestrator: Arc::new(orchestrator),
        ingestor: Arc::new(ingestor),
        embedding,
        dimension,
        call_timeout: config.provider_timeout(),
        metrics,
    })
}

/// Router with the service-wide layers applied.
pub fn app(state: AppState, config: &AppConfig) -> Router {
    // A disabled timeout is a very long one, so the layer stack keeps one type.
    let timeout_duration = if config.resilience.timeout_disabled {
        Duration::from_secs(365 * 24 * 60 * 60)
    } else {
        Duration::from_secs(config.resilience.request_timeout_secs)
    };

    api::router(state)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB limit
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(timeout_duration, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => {
                        tracing::error!(budget = ?timeout_duration, "Request timed out");
                        OrchestratorError::CompletionFailed {
                            status: None,
                            detail: format!("request exceeded {timeout_duration:?}"),
                        }
                        .into_response()
                    }
                }
            },
        ))
        .layer(TraceLayer::new_for_http())
}

/// Start the Axum server with the provided configuration.
pub async fn start_server(
    config: Arc<AppConfig>,
    metrics: Option<PrometheusHandle>,
) -> anyhow::Result<()> {
    let state = build_state(&config, metrics).await?;
    let app = app(state, &config);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        memory = %config.memory.provider,
        "Server started"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(name: "server.stopped", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
