//! # Vector Index Client Module
//!
//! ## Purpose
//! Thin client for the external vector index service: vector upsert,
//! filtered nearest-neighbor queries, delete-by-filter, metadata patching
//! and index statistics.
//!
//! ## Input/Output Specification
//! - **Input**: Vector records with typed metadata, query vectors, filters
//! - **Output**: Ranked matches with scores and metadata, index statistics
//! - **Bootstrap**: Idempotent create-if-absent at engine startup
//!
//! ## Key Features
//! - Async trait boundary so the service can be stubbed in tests
//! - Fully typed record metadata (no dynamic attribute probing)
//! - Per-request timeout and bounded exponential-backoff retries

use crate::config::VectorIndexConfig;
use crate::errors::{Result, RetrievalError};
use crate::{Chunk, CredibilityLevel, DocumentType, IndexStatistics};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Metadata stored alongside every vector. Optional analysis fields default
/// to empty on the way back out of the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecordMetadata {
    pub text: String,
    pub source: String,
    pub title: String,
    pub document_type: DocumentType,
    pub credibility_level: CredibilityLevel,
    pub last_updated: DateTime<Utc>,
    pub chunk_index: usize,
    #[serde(default)]
    pub domain_terms: Vec<String>,
    #[serde(default)]
    pub key_concepts: Vec<String>,
}

impl From<&Chunk> for VectorRecordMetadata {
    fn from(chunk: &Chunk) -> Self {
        Self {
            text: chunk.text.clone(),
            source: chunk.metadata.source.clone(),
            title: chunk.metadata.title.clone(),
            document_type: chunk.metadata.document_type,
            credibility_level: chunk.metadata.credibility_level,
            last_updated: chunk.metadata.last_updated,
            chunk_index: chunk.chunk_index,
            domain_terms: chunk.domain_terms.clone(),
            key_concepts: chunk.key_concepts.clone(),
        }
    }
}

/// A vector with its natural key and metadata, ready for upsert
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: VectorRecordMetadata,
}

/// One ranked match from a nearest-neighbor query
#[derive(Debug, Clone, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: VectorRecordMetadata,
}

/// Interface to the external vector index service
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite records by id
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// Nearest-neighbor query with an optional metadata predicate
    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        filter: Option<Value>,
    ) -> Result<Vec<VectorMatch>>;

    /// Remove all vectors whose metadata matches the predicate
    async fn delete_by_filter(&self, filter: Value) -> Result<()>;

    /// Merge metadata updates into all vectors matching the predicate
    async fn patch_metadata(&self, filter: Value, updates: Value) -> Result<()>;

    /// Read-only projection of the index's own state
    async fn describe_stats(&self) -> Result<IndexStatistics>;
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
}

#[derive(Debug, Serialize)]
struct QueryRequest {
    vector: Vec<f32>,
    top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    matches: Vec<VectorMatch>,
}

/// HTTP client for the remote vector index service
pub struct RemoteVectorIndex {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    index_name: String,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl RemoteVectorIndex {
    pub fn new(config: &VectorIndexConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| RetrievalError::Config {
                message: format!("Failed to build vector index HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            index_name: config.index_name.clone(),
            retry_attempts: config.retry_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    /// Create the index if it does not exist. Idempotent; called once at
    /// engine startup.
    pub async fn ensure_index(&self, dimension: usize, metric: &str) -> Result<()> {
        let request = self
            .authorized(self.client.post(format!("{}/indexes", self.endpoint)))
            .json(&CreateIndexRequest {
                name: &self.index_name,
                dimension,
                metric,
            });

        let response = request.send().await?;
        // Conflict means the index already exists with this name
        if response.status() == reqwest::StatusCode::CONFLICT || response.status().is_success() {
            return Ok(());
        }

        Err(RetrievalError::IndexUnavailable {
            service: self.index_name.clone(),
            details: format!("index bootstrap failed with status {}", response.status()),
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn index_url(&self, suffix: &str) -> String {
        format!("{}/indexes/{}/{}", self.endpoint, self.index_name, suffix)
    }

    async fn execute(
        &self,
        operation: &str,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let mut last_error = None;

        for attempt in 0..self.retry_attempts {
            if attempt > 0 {
                let backoff = self.retry_delay * 2u32.saturating_pow(attempt - 1);
                tokio::time::sleep(backoff).await;
            }

            let outcome = match build().send().await {
                Ok(response) => response.error_for_status().map_err(|e| {
                    RetrievalError::IndexUnavailable {
                        service: self.index_name.clone(),
                        details: e.to_string(),
                    }
                }),
                Err(e) => Err(RetrievalError::from(e)),
            };

            match outcome {
                Ok(response) => return Ok(response),
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        error = %e,
                        "vector index request failed, retrying"
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(RetrievalError::RetriesExhausted {
            operation: operation.to_string(),
            attempts: self.retry_attempts,
            details: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

#[async_trait]
impl VectorIndex for RemoteVectorIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let body = serde_json::json!({ "records": records });
        self.execute("upsert", || {
            self.authorized(self.client.post(self.index_url("vectors/upsert")))
                .json(&body)
        })
        .await?;
        Ok(())
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        filter: Option<Value>,
    ) -> Result<Vec<VectorMatch>> {
        let body = QueryRequest {
            vector,
            top_k,
            filter,
        };
        let response = self
            .execute("query", || {
                self.authorized(self.client.post(self.index_url("query")))
                    .json(&body)
            })
            .await?;

        let parsed: QueryResponse = response.json().await?;
        Ok(parsed.matches)
    }

    async fn delete_by_filter(&self, filter: Value) -> Result<()> {
        let body = serde_json::json!({ "filter": filter });
        self.execute("delete", || {
            self.authorized(self.client.post(self.index_url("vectors/delete")))
                .json(&body)
        })
        .await?;
        Ok(())
    }

    async fn patch_metadata(&self, filter: Value, updates: Value) -> Result<()> {
        let body = serde_json::json!({ "filter": filter, "updates": updates });
        self.execute("patch_metadata", || {
            self.authorized(self.client.post(self.index_url("vectors/update")))
                .json(&body)
        })
        .await?;
        Ok(())
    }

    async fn describe_stats(&self) -> Result<IndexStatistics> {
        let response = self
            .execute("describe_stats", || {
                self.authorized(self.client.get(self.index_url("stats")))
            })
            .await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: String) -> VectorIndexConfig {
        VectorIndexConfig {
            endpoint,
            api_key: None,
            index_name: "medical-documents".to_string(),
            metric: "cosine".to_string(),
            request_timeout_seconds: 5,
            retry_attempts: 2,
            retry_delay_ms: 10,
        }
    }

    #[tokio::test]
    async fn test_query_parses_matches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/medical-documents/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "matches": [{
                    "id": "abc",
                    "score": 0.87,
                    "metadata": {
                        "text": "Diabetes overview",
                        "source": "doc1",
                        "title": "Diabetes",
                        "document_type": "medical_guideline",
                        "credibility_level": "high",
                        "last_updated": "2024-06-01T00:00:00Z",
                        "chunk_index": 0
                    }
                }]
            })))
            .mount(&server)
            .await;

        let index = RemoteVectorIndex::new(&config(server.uri())).unwrap();
        let matches = index.query(vec![0.1; 4], 10, None).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].metadata.source, "doc1");
        assert!((matches[0].score - 0.87).abs() < 1e-6);
        // Absent analysis fields default to empty
        assert!(matches[0].metadata.domain_terms.is_empty());
    }

    #[tokio::test]
    async fn test_ensure_index_treats_conflict_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let index = RemoteVectorIndex::new(&config(server.uri())).unwrap();
        assert!(index.ensure_index(1536, "cosine").await.is_ok());
    }
}
