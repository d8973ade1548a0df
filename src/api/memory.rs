use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::AppState;

/// Request body for memory ingestion.
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    /// Text blocks, one record each.
    #[serde(default)]
    pub texts: Vec<String>,
    /// Origin tag stored with every record. Defaults to the configured source.
    #[serde(default)]
    pub source: Option<String>,
}

/// POST /api/memory - embed and store text blocks.
///
/// Per-block failures are listed in the report; the call itself only fails
/// when the body is unusable.
pub async fn ingest(
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "text": rejection.body_text() })),
            )
                .into_response();
        }
    };

    if req.texts.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "text": "Aucun texte à injecter" })),
        )
            .into_response();
    }

    let report = state
        .ingestor
        .ingest(&req.texts, req.source.as_deref())
        .await;
    Json(report).into_response()
}
