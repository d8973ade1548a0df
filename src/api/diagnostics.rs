use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::AppState;
use crate::rag::with_timeout;

/// Text embedded by the dimension probe.
const PROBE_TEXT: &str = "Bonjour, ceci est un test d'embedding.";

#[derive(Debug, Serialize)]
pub struct EmbeddingCheck {
    pub dimension: usize,
    pub expected: usize,
    pub ok: bool,
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/embeddings/check - embed a probe text and compare dimensions.
pub async fn embedding_check(State(state): State<AppState>) -> Response {
    match with_timeout(
        state.call_timeout,
        "embedding",
        state.embedding.embed(PROBE_TEXT),
    )
    .await
    {
        Ok(vector) => {
            let check = EmbeddingCheck {
                dimension: vector.len(),
                expected: state.dimension,
                ok: vector.len() == state.dimension,
            };
            tracing::info!(
                dimension = check.dimension,
                expected = check.expected,
                "Embedding probe finished"
            );
            Json(check).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Embedding probe failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "text": format!("Erreur embedding : {}", e.detail()) })),
            )
                .into_response()
        }
    }
}

/// GET /metrics - Prometheus text format.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
