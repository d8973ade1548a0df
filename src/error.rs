//! Error types shared by the provider adapters and the RAG pipeline.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failure signal of every external capability (embedding, completion, store).
///
/// Adapters report what happened; deciding whether a failure is fatal belongs
/// to the orchestrator.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request never produced an HTTP response (DNS, connect, TLS, reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("provider returned status {status}: {detail}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body, kept for diagnosis.
        detail: String,
    },

    /// The provider answered 2xx but the body carries an error payload.
    #[error("provider error payload: {0}")]
    Payload(String),

    /// The response body does not have the expected shape.
    #[error("malformed provider response: {0}")]
    Malformed(String),

    /// A vector does not have the configured dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimension.
        expected: usize,
        /// Received length.
        actual: usize,
    },

    /// The call did not complete within its time budget.
    #[error("provider call timed out: {0}")]
    Timeout(String),

    /// The adapter is missing required settings.
    #[error("provider not configured: {0}")]
    Config(String),
}

impl ProviderError {
    /// Diagnostic text suitable for returning to a caller.
    pub fn detail(&self) -> String {
        match self {
            Self::Status { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                detail: err.to_string(),
            }
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<sqlx::Error> for ProviderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Outcome of a failed chat request, as seen by the caller.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// The message is empty or missing.
    #[error("{0}")]
    InvalidInput(String),

    /// The completion provider failed; carries the upstream diagnostic.
    #[error("completion failed: {detail}")]
    CompletionFailed {
        /// Upstream status, when the provider answered at all.
        status: Option<u16>,
        /// Raw upstream detail.
        detail: String,
    },

    /// Anything not anticipated by the pipeline.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl OrchestratorError {
    /// HTTP status the error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::CompletionFailed { .. } => StatusCode::BAD_GATEWAY,
            Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing message placed in the `text` field of the response.
    pub fn message(&self) -> String {
        match self {
            Self::InvalidInput(msg) => msg.clone(),
            Self::CompletionFailed { detail, .. } => format!("Erreur IA provider : {detail}"),
            Self::Unexpected(msg) => format!("Erreur serveur : {msg}"),
        }
    }
}

impl IntoResponse for OrchestratorError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "text": self.message() }))).into_response()
    }
}
