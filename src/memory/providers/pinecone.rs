use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::embedding::validate_embedding;
use crate::error::ProviderError;
use crate::memory::{MemoryMetadata, MemoryRecord, QueryMatch, VectorStore};

/// API version header sent on every Pinecone request.
const PINECONE_API_VERSION: &str = "2024-07";

/// Connection settings for [`PineconeStore`].
#[derive(Debug, Clone)]
pub struct PineconeSettings {
    pub api_key: String,
    /// Data-plane host of the index. Resolved from `index_name` when absent.
    pub host: Option<String>,
    pub index_name: Option<String>,
    pub namespace: Option<String>,
    /// Control-plane base URL, used only to resolve the index host.
    pub control_url: String,
    pub dimension: usize,
    pub timeout: Duration,
}

/// Pinecone index accessed through its REST data plane.
#[derive(Clone)]
pub struct PineconeStore {
    http: reqwest::Client,
    host: String,
    api_key: String,
    namespace: Option<String>,
    dimension: usize,
}

impl std::fmt::Debug for PineconeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeStore")
            .field("host", &self.host)
            .field("namespace", &self.namespace)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl PineconeStore {
    pub async fn connect(settings: PineconeSettings) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ProviderError::Config(e.to_string()))?;

        let host = match (&settings.host, &settings.index_name) {
            (Some(host), _) => host.clone(),
            (None, Some(name)) => {
                resolve_host(&http, &settings.control_url, &settings.api_key, name).await?
            }
            (None, None) => {
                return Err(ProviderError::Config(
                    "pinecone needs either an index host or an index name".to_string(),
                ));
            }
        };
        let host = with_scheme(&host);

        tracing::info!(host = %host, "Pinecone index resolved");

        Ok(Self {
            http,
            host,
            api_key: settings.api_key,
            namespace: settings.namespace,
            dimension: settings.dimension,
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let url = format!("{}{path}", self.host);
        let resp = self
            .http
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(resp.json().await?)
    }
}

async fn resolve_host(
    http: &reqwest::Client,
    control_url: &str,
    api_key: &str,
    index_name: &str,
) -> Result<String, ProviderError> {
    let url = format!("{}/indexes/{index_name}", control_url.trim_end_matches('/'));
    let resp = http
        .get(&url)
        .header("Api-Key", api_key)
        .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let detail = resp.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            status: status.as_u16(),
            detail,
        });
    }

    let v: Value = resp.json().await?;
    v.get("host")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| ProviderError::Malformed("index description has no host".to_string()))
}

fn with_scheme(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

/// Convert one entry of a query response's `matches` array.
///
/// Entries without a text payload carry nothing usable as context and yield
/// `None`.
fn parse_match(m: &Value) -> Option<QueryMatch> {
    let metadata = m.get("metadata")?;
    let text = metadata.get("text")?.as_str()?.to_string();

    let created_at = metadata
        .get("createdAt")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc));
    let source = metadata
        .get("source")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let score = m.get("score").and_then(Value::as_f64).unwrap_or_default() as f32;

    Some(QueryMatch {
        id: m.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
        score,
        metadata: MemoryMetadata {
            text,
            created_at,
            source,
        },
    })
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, record: MemoryRecord) -> Result<(), ProviderError> {
        validate_embedding(&record.vector, self.dimension)?;

        let mut metadata = json!({
            "text": record.metadata.text,
            "source": record.metadata.source,
        });
        if let Some(ts) = record.metadata.created_at {
            metadata["createdAt"] = json!(ts.to_rfc3339());
        }

        let mut body = json!({
            "vectors": [{
                "id": record.id,
                "values": record.vector,
                "metadata": metadata,
            }]
        });
        if let Some(ns) = &self.namespace {
            body["namespace"] = json!(ns);
        }

        let resp = self.post("/vectors/upsert", &body).await?;
        let upserted = resp.get("upsertedCount").and_then(Value::as_u64);
        tracing::debug!(upserted, "Pinecone upsert acknowledged");
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, ProviderError> {
        validate_embedding(vector, self.dimension)?;

        let mut body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "includeValues": false,
        });
        if let Some(ns) = &self.namespace {
            body["namespace"] = json!(ns);
        }

        let resp = self.post("/query", &body).await?;
        let matches = resp
            .get("matches")
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::Malformed("query response has no matches".to_string()))?;

        let parsed: Vec<QueryMatch> = matches.iter().filter_map(parse_match).collect();
        if parsed.len() < matches.len() {
            tracing::debug!(
                skipped = matches.len() - parsed.len(),
                "Pinecone matches without text metadata skipped"
            );
        }
        Ok(parsed)
    }
}
