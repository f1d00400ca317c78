//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the retrieval engine, providing typed error
//! variants and conversion utilities for all system components.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from various system components
//! - **Output**: Structured error types with context and error chains
//! - **Error Categories**: Validation, Ingestion, Embedding, Retrieval, API, Configuration
//!
//! ## Key Features
//! - Typed errors with detailed context
//! - Automatic error conversion and chaining
//! - User-friendly error messages for API responses
//! - Structured logging integration
//!
//! ## Usage
//! ```rust
//! use hybrid_med_retrieval::errors::{Result, RetrievalError};
//!
//! fn search_operation() -> Result<Vec<String>> {
//!     Err(RetrievalError::IndexUnavailable {
//!         service: "vector-index".to_string(),
//!         details: "connection refused".to_string(),
//!     })
//! }
//! ```

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Error types for the retrieval engine
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Malformed search query, rejected before any I/O
    #[error("Validation failed for field '{field}': {reason}")]
    ValidationFailed { field: String, reason: String },

    /// The embedding collaborator errored or timed out
    #[error("Embedding generation failed: {text_preview} - {reason}")]
    EmbeddingFailed {
        text_preview: String,
        reason: String,
    },

    /// The vector index service is unreachable or rejected the request
    #[error("Index service '{service}' is unavailable: {details}")]
    IndexUnavailable { service: String, details: String },

    /// A search-path failure that prevents producing a result set
    #[error("Retrieval failed: {details}")]
    RetrievalFailed { details: String },

    /// A single document failed to chunk, embed, or upsert during ingestion
    #[error("Ingestion failed for document '{doc_source}': {details}")]
    IngestionItemFailed { doc_source: String, details: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization failed: {message}")]
    SerializationFailed { message: String },

    /// Network-related errors at the collaborator boundary
    #[error("Network error: {details}")]
    NetworkError { details: String },

    /// Retries against a collaborator were exhausted
    #[error("Retries exhausted for '{operation}' after {attempts} attempts: {details}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        details: String,
    },

    /// Invalid API request payload
    #[error("Invalid API request: {details}")]
    InvalidApiRequest { details: String },

    /// Internal system errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RetrievalError {
    /// Check if the error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RetrievalError::NetworkError { .. } | RetrievalError::IndexUnavailable { .. }
        )
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            RetrievalError::ValidationFailed { .. } => "validation",
            RetrievalError::IngestionItemFailed { .. } => "ingestion",
            RetrievalError::EmbeddingFailed { .. } => "embedding",
            RetrievalError::IndexUnavailable { .. }
            | RetrievalError::RetrievalFailed { .. }
            | RetrievalError::RetriesExhausted { .. } => "retrieval",
            RetrievalError::NetworkError { .. } => "network",
            RetrievalError::Config { .. } => "configuration",
            RetrievalError::InvalidApiRequest { .. } => "api",
            RetrievalError::SerializationFailed { .. } | RetrievalError::Internal { .. } => {
                "generic"
            }
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for RetrievalError {
    fn from(err: std::io::Error) -> Self {
        RetrievalError::Internal {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<serde_json::Error> for RetrievalError {
    fn from(err: serde_json::Error) -> Self {
        RetrievalError::SerializationFailed {
            message: format!("JSON serialization error: {}", err),
        }
    }
}

impl From<reqwest::Error> for RetrievalError {
    fn from(err: reqwest::Error) -> Self {
        RetrievalError::NetworkError {
            details: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for RetrievalError {
    fn from(err: toml::de::Error) -> Self {
        RetrievalError::Config {
            message: format!("TOML parse error: {}", err),
        }
    }
}

// Helper macros for common error patterns
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::errors::RetrievalError::Internal {
            message: $msg.to_string(),
        }
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::errors::RetrievalError::Internal {
            message: format!($fmt, $($arg)*),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($field:expr, $reason:expr) => {
        $crate::errors::RetrievalError::ValidationFailed {
            field: $field.to_string(),
            reason: $reason.to_string(),
        }
    };
}
