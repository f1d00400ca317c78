//! # Document Ingestion Module
//!
//! ## Purpose
//! Handles ingestion of medical reference documents: validation, chunking,
//! concurrent embedding, vector upsert and keyword index maintenance, with
//! per-item error isolation.
//!
//! ## Input/Output Specification
//! - **Input**: Document batches, delete and metadata-patch requests
//! - **Output**: Per-batch reports with counts and bounded error lists
//! - **Semantics**: Re-ingesting a source replaces its prior chunks
//!
//! ## Key Features
//! - Fixed-size batch processing with cooperative rate limiting
//! - Bounded concurrent embedding within each batch
//! - One vector upsert per batch of successfully embedded chunks
//! - Per-document error collection that never aborts sibling documents
//! - Keyword index rebuild and cache invalidation after mutations
//!
//! ## Architecture
//! - `pipeline`: Batch processing pipeline and corpus bookkeeping
//! - `validation`: Pre-I/O document validation

pub mod pipeline;
pub mod validation;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CredibilityLevel, DocumentType};

pub use pipeline::IngestionPipeline;
pub use validation::DocumentValidator;

/// Outcome of a batch ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionReport {
    /// Documents submitted
    pub total_documents: usize,
    /// Documents fully chunked, embedded and upserted
    pub successful_uploads: usize,
    /// Documents with at least one failure
    pub failed_uploads: usize,
    /// Bounded list of error descriptions
    pub errors: Vec<String>,
    /// Wall-clock processing time
    pub processing_time_seconds: f64,
}

/// Outcome of a single maintenance operation (delete, metadata patch)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationReport {
    pub success: bool,
    pub message: String,
    pub operation_time_seconds: f64,
}

/// Typed metadata patch with optional fields. Absent fields are left
/// unchanged; enrichment is plain field assignment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credibility_level: Option<CredibilityLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.document_type.is_none()
            && self.credibility_level.is_none()
            && self.last_updated.is_none()
    }
}
