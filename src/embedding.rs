//! # Embedding Client Module
//!
//! ## Purpose
//! Thin client for the external embedding provider that converts chunk and
//! query text into fixed-dimension vectors.
//!
//! ## Input/Output Specification
//! - **Input**: Text (chunk or query)
//! - **Output**: Embedding vector of the configured dimension
//! - **Failure**: Typed `EmbeddingFailed` after bounded retries
//!
//! ## Key Features
//! - Async trait boundary so the provider can be stubbed in tests
//! - Per-request timeout and bounded exponential-backoff retries
//! - Response dimension verification on every call

use crate::config::EmbeddingConfig;
use crate::errors::{Result, RetrievalError};
use crate::utils::TextUtils;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Interface to the external embedding provider.
///
/// May be invoked concurrently for many chunks; implementations must be
/// safe to share across tasks.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Convert text into a fixed-dimension vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// The dimension every returned vector has
    fn dimension(&self) -> usize;
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// HTTP client for the embedding service
pub struct HttpEmbeddingClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    dimension: usize,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl HttpEmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| RetrievalError::Config {
                message: format!("Failed to build embedding HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            dimension: config.dimension,
            retry_attempts: config.retry_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let mut request = self
            .client
            .post(format!("{}/embed", self.endpoint))
            .json(&EmbedRequest { input: text });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status().map_err(|e| {
            RetrievalError::NetworkError {
                details: e.to_string(),
            }
        })?;

        let parsed: EmbedResponse = response.json().await?;
        Ok(parsed.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut last_error = None;

        for attempt in 0..self.retry_attempts {
            if attempt > 0 {
                let backoff = self.retry_delay * 2u32.saturating_pow(attempt - 1);
                tokio::time::sleep(backoff).await;
            }

            match self.request_embedding(text).await {
                Ok(vector) => {
                    if vector.len() != self.dimension {
                        return Err(RetrievalError::EmbeddingFailed {
                            text_preview: TextUtils::truncate(text, 60),
                            reason: format!(
                                "dimension mismatch: expected {}, got {}",
                                self.dimension,
                                vector.len()
                            ),
                        });
                    }
                    return Ok(vector);
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        error = %e,
                        "embedding request failed, retrying"
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(RetrievalError::EmbeddingFailed {
            text_preview: TextUtils::truncate(text, 60),
            reason: format!(
                "retries exhausted after {} attempts: {}",
                self.retry_attempts,
                last_error.map(|e| e.to_string()).unwrap_or_default()
            ),
        })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
