use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;

use crate::AppState;
use crate::error::OrchestratorError;
use crate::rag::ChatAnswer;

/// Request body for the chat API.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// User message. Missing and empty are treated alike.
    #[serde(default)]
    pub message: Option<String>,
}

/// POST /api/chat - answer a message with retrieved context.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatAnswer>, OrchestratorError> {
    // An unreadable body carries no message.
    let message = match payload {
        Ok(Json(req)) => req.message.unwrap_or_default(),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Chat body rejected");
            String::new()
        }
    };

    let answer = state.orchestrator.handle(&message).await?;
    Ok(Json(answer))
}
