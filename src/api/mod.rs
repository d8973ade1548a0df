//! HTTP surface.
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | `/api/chat` | POST | RAG answer for `{ message }` |
//! | `/api/memory` | POST | Ingest `{ texts, source? }` into the vector store |
//! | `/api/embeddings/check` | GET | Probe the embedding provider's dimension |
//! | `/health` | GET | Liveness |
//! | `/metrics` | GET | Prometheus exposition |
//!
//! Every error body has the shape `{ "text": <message> }`.

pub mod chat;
pub mod diagnostics;
pub mod memory;

use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use crate::AppState;

/// Body returned for a verb the route does not accept.
pub const METHOD_NOT_ALLOWED: &str = "Méthode non autorisée";

/// Build the application router with its state attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat::chat).fallback(method_not_allowed))
        .route("/api/memory", post(memory::ingest).fallback(method_not_allowed))
        .route(
            "/api/embeddings/check",
            get(diagnostics::embedding_check).fallback(method_not_allowed),
        )
        .route("/health", get(diagnostics::health))
        .route("/metrics", get(diagnostics::metrics))
        .with_state(state)
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "text": METHOD_NOT_ALLOWED })),
    )
}
