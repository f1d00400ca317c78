//! # Hybrid Medical Document Retrieval Engine
//!
//! ## Overview
//! This library implements a hybrid retrieval engine for medical reference
//! documents that combines semantic vector search with lexical TF-IDF search.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `ingestion`: Batched document ingestion, chunk embedding and upsert
//! - `segmenter`: Context-preserving text chunking and term extraction
//! - `embedding`: Client for the external embedding provider
//! - `vector_index`: Client for the external vector index service
//! - `keyword`: In-process TF-IDF keyword index
//! - `search`: Search orchestrator combining vector and keyword strategies
//! - `filter`: Metadata filter evaluation and translation
//! - `cache`: TTL-bounded search result cache
//! - `api`: REST API endpoints
//! - `config`: Configuration management and settings
//! - `errors`: Centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: Medical reference documents (JSON), search queries (text)
//! - **Output**: Ranked search results with document metadata and scores
//! - **Performance**: Sub-second query response times, deterministic ordering
//!
//! ## Usage
//! ```rust,no_run
//! use hybrid_med_retrieval::config::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config.toml")?;
//!     println!("chunk size: {}", config.chunking.chunk_size);
//!     Ok(())
//! }
//! ```

// Core modules
pub mod config;
pub mod errors;
pub mod ingestion;
pub mod segmenter;
pub mod embedding;
pub mod vector_index;
pub mod keyword;
pub mod filter;
pub mod cache;
pub mod search;
pub mod api;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use errors::{Result, RetrievalError};
pub use search::{SearchEngine, SearchQuery, SearchResponse, SearchResult};

// Core types used throughout the system
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Category of a medical reference document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    MedicalGuideline,
    DrugInformation,
    SymptomDescription,
    TreatmentProtocol,
    DiagnosticCriteria,
    ResearchPaper,
    ClinicalTrial,
    PatientEducation,
    EmergencyProtocol,
}

/// Trustworthiness tier of a document's source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredibilityLevel {
    High,
    Medium,
    Low,
}

impl CredibilityLevel {
    /// Additive confidence adjustment for this tier
    pub fn boost(self) -> f32 {
        match self {
            CredibilityLevel::High => 0.2,
            CredibilityLevel::Medium => 0.1,
            CredibilityLevel::Low => 0.0,
        }
    }
}

/// A medical reference document submitted for ingestion.
///
/// Immutable once chunked; re-ingestion under the same `source` replaces
/// all previously indexed chunks for that source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Full document text
    pub content: String,
    /// Unique identifier for the logical document
    pub source: String,
    /// Human-readable title
    pub title: String,
    /// Document category
    pub document_type: DocumentType,
    /// Source trustworthiness tier
    pub credibility_level: CredibilityLevel,
    /// Last revision timestamp
    pub last_updated: DateTime<Utc>,
}

/// Metadata carried by every chunk, denormalized from its parent document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub title: String,
    pub document_type: DocumentType,
    pub credibility_level: CredibilityLevel,
    pub last_updated: DateTime<Utc>,
}

/// A bounded slice of a document's text, the unit of indexing and retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic hash of source, chunk index and leading text.
    /// Stable across re-ingestion of identical content.
    pub chunk_id: String,
    /// Ordinal position within the parent document
    pub chunk_index: usize,
    /// Chunk text
    pub text: String,
    /// Controlled-vocabulary terms found in the text
    pub domain_terms: Vec<String>,
    /// Extracted noun phrases and entities (empty when no analyzer is loaded)
    pub key_concepts: Vec<String>,
    /// Denormalized parent document metadata
    pub metadata: ChunkMetadata,
}

/// Read-only projection of the vector index service's own state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatistics {
    pub total_vector_count: usize,
    pub dimension: usize,
    pub index_fullness: f32,
    pub namespaces: HashMap<String, usize>,
}

/// Application state shared across components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub search_engine: Arc<search::SearchEngine>,
    pub pipeline: Arc<ingestion::IngestionPipeline>,
}
