//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration management for the retrieval engine, supporting
//! configuration files and environment variables with validation and
//! type-safe access to all system settings.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Type checking, range validation, dependency verification
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables (highest priority)
//! 2. Configuration files
//! 3. Default values (lowest priority)
//!
//! ## Usage
//! ```rust
//! use hybrid_med_retrieval::config::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.chunking.chunk_size, 1000);
//! ```

use crate::errors::{Result, RetrievalError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server and API configuration
    pub server: ServerConfig,
    /// Text chunking settings
    pub chunking: ChunkingConfig,
    /// Embedding provider settings
    pub embedding: EmbeddingConfig,
    /// Vector index service settings
    pub vector_index: VectorIndexConfig,
    /// Document ingestion settings
    pub ingestion: IngestionConfig,
    /// Search engine behavior
    pub search: SearchEngineConfig,
    /// Logging and monitoring
    pub logging: LoggingConfig,
}

/// Server and API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request payload size in MB
    pub max_payload_size_mb: u32,
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Minimum overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
    /// Load the linguistic analyzer for key-concept extraction
    pub enable_concept_extraction: bool,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding service base URL
    pub endpoint: String,
    /// API key for authentication (optional)
    pub api_key: Option<String>,
    /// Embedding vector dimension (fixed at index-configuration time)
    pub dimension: usize,
    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,
    /// Maximum retry attempts per request
    pub retry_attempts: u32,
    /// Initial retry backoff delay in milliseconds
    pub retry_delay_ms: u64,
    /// Maximum concurrent embedding calls during ingestion
    pub max_concurrent_requests: usize,
}

/// Vector index service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    /// Vector index service base URL
    pub endpoint: String,
    /// API key for authentication (optional)
    pub api_key: Option<String>,
    /// Index name to create or attach to at startup
    pub index_name: String,
    /// Distance metric used when the index is created
    pub metric: String,
    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,
    /// Maximum retry attempts per request
    pub retry_attempts: u32,
    /// Initial retry backoff delay in milliseconds
    pub retry_delay_ms: u64,
}

/// Document ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Documents processed per batch
    pub batch_size: usize,
    /// Pause between batches in milliseconds (collaborator rate limits)
    pub rate_limit_delay_ms: u64,
    /// Maximum number of error strings reported per batch
    pub max_reported_errors: usize,
}

/// Search engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEngineConfig {
    /// Default maximum number of results
    pub default_max_results: usize,
    /// Default minimum relevance score
    pub default_min_score: f32,
    /// Candidates requested from each index before fusion
    pub candidate_pool_size: usize,
    /// Hybrid fusion weight for vector scores (empirically tuned)
    pub vector_weight: f32,
    /// Hybrid fusion weight for keyword scores (empirically tuned)
    pub keyword_weight: f32,
    /// Per-term relevance boost step for semantic search (empirically tuned)
    pub semantic_boost_step: f32,
    /// Base confidence for keyword-only matches
    pub lexical_confidence_base: f32,
    /// Enable query result caching
    pub enable_query_cache: bool,
    /// Query cache size (number of entries)
    pub query_cache_size: usize,
    /// Query cache TTL in seconds
    pub cache_ttl_seconds: u64,
    /// Minimum query length in characters
    pub min_query_length: usize,
    /// Maximum query length in characters
    pub max_query_length: usize,
}

/// Logging and monitoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

impl Config {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            let mut config = Self::default();
            config.apply_env_overrides()?;
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| RetrievalError::Config {
            message: format!("Failed to read config file {:?}: {}", path, e),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| RetrievalError::Config {
            message: format!("Failed to parse config file {:?}: {}", path, e),
        })?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("MED_RETRIEVAL_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("MED_RETRIEVAL_PORT") {
            self.server.port = port.parse().map_err(|_| RetrievalError::Config {
                message: "Invalid port number in MED_RETRIEVAL_PORT".to_string(),
            })?;
        }
        if let Ok(endpoint) = std::env::var("MED_RETRIEVAL_EMBEDDING_ENDPOINT") {
            self.embedding.endpoint = endpoint;
        }
        if let Ok(api_key) = std::env::var("MED_RETRIEVAL_EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(api_key);
        }
        if let Ok(endpoint) = std::env::var("MED_RETRIEVAL_INDEX_ENDPOINT") {
            self.vector_index.endpoint = endpoint;
        }
        if let Ok(api_key) = std::env::var("MED_RETRIEVAL_INDEX_API_KEY") {
            self.vector_index.api_key = Some(api_key);
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(RetrievalError::ValidationFailed {
                field: "server.port".to_string(),
                reason: "Port cannot be zero".to_string(),
            });
        }

        if self.chunking.chunk_size == 0 {
            return Err(RetrievalError::ValidationFailed {
                field: "chunking.chunk_size".to_string(),
                reason: "Chunk size must be greater than zero".to_string(),
            });
        }

        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(RetrievalError::ValidationFailed {
                field: "chunking.chunk_overlap".to_string(),
                reason: "Chunk overlap must be smaller than chunk size".to_string(),
            });
        }

        if self.embedding.dimension == 0 {
            return Err(RetrievalError::ValidationFailed {
                field: "embedding.dimension".to_string(),
                reason: "Embedding dimension must be greater than zero".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.search.default_min_score) {
            return Err(RetrievalError::ValidationFailed {
                field: "search.default_min_score".to_string(),
                reason: "Minimum score must be between 0.0 and 1.0".to_string(),
            });
        }

        if self.search.vector_weight <= 0.0 || self.search.keyword_weight <= 0.0 {
            return Err(RetrievalError::ValidationFailed {
                field: "search.vector_weight".to_string(),
                reason: "Fusion weights must be positive".to_string(),
            });
        }

        if self.search.min_query_length > self.search.max_query_length {
            return Err(RetrievalError::ValidationFailed {
                field: "search.min_query_length".to_string(),
                reason: "Minimum query length cannot be greater than maximum".to_string(),
            });
        }

        if self.ingestion.batch_size == 0 {
            return Err(RetrievalError::ValidationFailed {
                field: "ingestion.batch_size".to_string(),
                reason: "Batch size must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Get configuration as TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RetrievalError::Config {
            message: format!("Failed to serialize config to TOML: {}", e),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                enable_cors: true,
                max_payload_size_mb: 10,
            },
            chunking: ChunkingConfig {
                chunk_size: 1000,
                chunk_overlap: 200,
                enable_concept_extraction: true,
            },
            embedding: EmbeddingConfig {
                endpoint: "http://127.0.0.1:9100".to_string(),
                api_key: None,
                dimension: 1536,
                request_timeout_seconds: 30,
                retry_attempts: 3,
                retry_delay_ms: 500,
                max_concurrent_requests: num_cpus::get().min(8),
            },
            vector_index: VectorIndexConfig {
                endpoint: "http://127.0.0.1:9200".to_string(),
                api_key: None,
                index_name: "medical-documents".to_string(),
                metric: "cosine".to_string(),
                request_timeout_seconds: 30,
                retry_attempts: 3,
                retry_delay_ms: 500,
            },
            ingestion: IngestionConfig {
                batch_size: 100,
                rate_limit_delay_ms: 500,
                max_reported_errors: 20,
            },
            search: SearchEngineConfig {
                default_max_results: 10,
                default_min_score: 0.5,
                candidate_pool_size: 50,
                vector_weight: 0.7,
                keyword_weight: 0.3,
                semantic_boost_step: 0.1,
                lexical_confidence_base: 0.6,
                enable_query_cache: true,
                query_cache_size: 10_000,
                cache_ttl_seconds: 300,
                min_query_length: 1,
                max_query_length: 1000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}
