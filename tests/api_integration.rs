mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use common::{
    CompleteBehavior, EmbedBehavior, FakeCompletion, FakeEmbedding, FakeStore, ingestor,
    orchestrator,
};
use rag_chat::AppState;
use rag_chat::api;
use rag_chat::config::AppConfig;
use rag_chat::memory::VectorStore;
use rag_chat::rag::{PersistMode, PromptComposer, RagOrchestrator};

fn server(
    embedding: Arc<FakeEmbedding>,
    store: Arc<FakeStore>,
    completion: Arc<FakeCompletion>,
) -> TestServer {
    let dimension = store.dimension();
    let state = AppState {
        orchestrator: Arc::new(orchestrator(embedding.clone(), store.clone(), completion)),
        ingestor: Arc::new(ingestor(embedding.clone(), store)),
        embedding,
        dimension,
        call_timeout: Duration::from_millis(200),
        metrics: None,
    };
    TestServer::new(api::router(state)).unwrap()
}

fn default_server() -> (TestServer, Arc<FakeEmbedding>, Arc<FakeStore>) {
    let embedding = FakeEmbedding::ok();
    let store = FakeStore::with_snippets(&["Note A", "Note B"]);
    let server = server(
        embedding.clone(),
        store.clone(),
        FakeCompletion::reply("Bonjour ! Comment puis-je aider ?"),
    );
    (server, embedding, store)
}

#[tokio::test]
async fn test_chat_returns_answer() {
    let (server, _, store) = default_server();

    let response = server.post("/api/chat").json(&json!({ "message": "Bonjour" })).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({ "text": "Bonjour ! Comment puis-je aider ?" })
    );
    assert_eq!(
        store.records()[0].metadata.text,
        "Bonjour | Bonjour ! Comment puis-je aider ?"
    );
}

#[tokio::test]
async fn test_chat_empty_message_is_bad_request() {
    let (server, embedding, store) = default_server();

    let response = server.post("/api/chat").json(&json!({ "message": "" })).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>(), json!({ "text": "Message vide" }));
    assert_eq!(embedding.calls(), 0);
    assert_eq!(store.queries(), 0);
}

#[tokio::test]
async fn test_chat_missing_message_is_bad_request() {
    let (server, embedding, _) = default_server();

    let response = server.post("/api/chat").json(&json!({})).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>(), json!({ "text": "Message vide" }));

    let response = server.post("/api/chat").text("not json").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>(), json!({ "text": "Message vide" }));

    assert_eq!(embedding.calls(), 0);
}

#[tokio::test]
async fn test_chat_wrong_method() {
    let (server, embedding, _) = default_server();

    for response in [
        server.get("/api/chat").await,
        server.put("/api/chat").json(&json!({ "message": "Bonjour" })).await,
        server.delete("/api/chat").await,
    ] {
        assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.json::<Value>(),
            json!({ "text": "Méthode non autorisée" })
        );
    }
    assert_eq!(embedding.calls(), 0);
}

#[tokio::test]
async fn test_chat_embedding_failure_still_answers() {
    let store = FakeStore::with_snippets(&["Note A"]);
    let server = server(
        FakeEmbedding::new(EmbedBehavior::Transport("dns failure".into())),
        store.clone(),
        FakeCompletion::reply("Réponse"),
    );

    let response = server.post("/api/chat").json(&json!({ "message": "Bonjour" })).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({ "text": "Réponse" }));
    assert_eq!(store.queries(), 0);
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn test_chat_completion_failure_is_bad_gateway() {
    let store = FakeStore::with_snippets(&[]);
    let server = server(
        FakeEmbedding::ok(),
        store.clone(),
        FakeCompletion::new(CompleteBehavior::Status(500, "model overloaded".into())),
    );

    let response = server.post("/api/chat").json(&json!({ "message": "Bonjour" })).await;

    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        response.json::<Value>(),
        json!({ "text": "Erreur IA provider : model overloaded" })
    );
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn test_chat_completion_transport_failure_is_server_error() {
    let server = server(
        FakeEmbedding::ok(),
        FakeStore::with_snippets(&[]),
        FakeCompletion::new(CompleteBehavior::Transport("connection refused".into())),
    );

    let response = server.post("/api/chat").json(&json!({ "message": "Bonjour" })).await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json::<Value>(),
        json!({ "text": "Erreur serveur : connection refused" })
    );
}

#[tokio::test]
async fn test_memory_ingest_reports_each_block() {
    let (server, _, store) = default_server();

    let response = server
        .post("/api/memory")
        .json(&json!({ "texts": ["Article 1", "  ", "Article 2"], "source": "CGA-2026" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["injected"], 2);
    assert_eq!(body["source"], "CGA-2026");
    assert_eq!(body["failed"][0]["index"], 1);

    let records = store.records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.id.starts_with("CGA-2026-")));
    assert!(records.iter().all(|r| r.metadata.source == "CGA-2026"));
    assert_eq!(records[1].metadata.text, "Article 2");
}

#[tokio::test]
async fn test_memory_ingest_default_source() {
    let (server, _, store) = default_server();

    let response = server
        .post("/api/memory")
        .json(&json!({ "texts": ["Article 1"] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["source"], "docs");
    assert_eq!(store.records()[0].metadata.source, "docs");
}

#[tokio::test]
async fn test_memory_ingest_dimension_mismatch_is_reported() {
    let store = FakeStore::with_snippets(&[]);
    let server = server(
        FakeEmbedding::new(EmbedBehavior::Vector(vec![0.1; 8])),
        store.clone(),
        FakeCompletion::reply("unused"),
    );

    let response = server
        .post("/api/memory")
        .json(&json!({ "texts": ["Article 1"] }))
        .await;

    let body = response.json::<Value>();
    assert_eq!(body["injected"], 0);
    assert!(
        body["failed"][0]["error"]
            .as_str()
            .unwrap()
            .contains("dimension mismatch")
    );
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn test_memory_ingest_checks_store_dimension() {
    // Vectors match DIM but the store expects 8 dimensions.
    let store = FakeStore::with_dimension(8, &[]);
    let server = server(FakeEmbedding::ok(), store.clone(), FakeCompletion::reply("unused"));

    let response = server
        .post("/api/memory")
        .json(&json!({ "texts": ["Article 1"] }))
        .await;

    let body = response.json::<Value>();
    assert_eq!(body["injected"], 0);
    assert!(
        body["failed"][0]["error"]
            .as_str()
            .unwrap()
            .contains("expected 8")
    );
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn test_request_timeout_returns_bad_gateway_text() {
    let mut config = AppConfig::load_from_args(["rag-chat"]).unwrap();
    config.resilience.request_timeout_secs = 1;

    let embedding = FakeEmbedding::ok();
    let store = FakeStore::with_snippets(&[]);
    let mut rag_settings = common::settings(PersistMode::Inline);
    rag_settings.call_timeout = Duration::from_secs(3600);
    let rag = RagOrchestrator::new(
        embedding.clone(),
        store.clone(),
        FakeCompletion::new(CompleteBehavior::Hang),
        PromptComposer::default(),
        rag_settings,
    );
    let state = AppState {
        orchestrator: Arc::new(rag),
        ingestor: Arc::new(ingestor(embedding.clone(), store)),
        embedding,
        dimension: common::DIM,
        call_timeout: Duration::from_millis(200),
        metrics: None,
    };
    let server = TestServer::new(rag_chat::server::app(state, &config)).unwrap();

    let response = server.post("/api/chat").json(&json!({ "message": "Bonjour" })).await;

    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    let text = response.json::<Value>()["text"].as_str().unwrap().to_string();
    assert!(text.starts_with("Erreur IA provider"), "{text}");
}

#[tokio::test]
async fn test_memory_ingest_requires_texts() {
    let (server, _, _) = default_server();

    let response = server.post("/api/memory").json(&json!({ "texts": [] })).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server.get("/api/memory").await;
    assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_embedding_check_reports_dimension() {
    let (server, _, _) = default_server();

    let response = server.get("/api/embeddings/check").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({ "dimension": 4, "expected": 4, "ok": true })
    );
}

#[tokio::test]
async fn test_embedding_check_mismatch_and_failure() {
    let server_mismatch = server(
        FakeEmbedding::new(EmbedBehavior::Vector(vec![0.0; 3])),
        FakeStore::with_snippets(&[]),
        FakeCompletion::reply("unused"),
    );
    let body = server_mismatch.get("/api/embeddings/check").await.json::<Value>();
    assert_eq!(body, json!({ "dimension": 3, "expected": 4, "ok": false }));

    let server_down = server(
        FakeEmbedding::new(EmbedBehavior::Status(401, "invalid token".into())),
        FakeStore::with_snippets(&[]),
        FakeCompletion::reply("unused"),
    );
    let response = server_down.get("/api/embeddings/check").await;
    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        response.json::<Value>(),
        json!({ "text": "Erreur embedding : invalid token" })
    );
}

#[tokio::test]
async fn test_health_and_metrics() {
    let (server, _, _) = default_server();

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "ok");

    // No recorder installed in tests.
    let response = server.get("/metrics").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
