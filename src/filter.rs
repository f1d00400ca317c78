//! # Filter Engine Module
//!
//! ## Purpose
//! Declarative metadata filtering for search results: document type,
//! credibility level, source membership and date-range constraints,
//! applied conjunctively.
//!
//! ## Input/Output Specification
//! - **Input**: Filter set from a search query, candidate result metadata
//! - **Output**: Boolean match decision; index-service filter predicates
//! - **Semantics**: Every present filter kind must match; absent kinds
//!   impose no constraint
//!
//! ## Key Features
//! - Typed filter kinds, exhaustively matched
//! - Pure evaluation with no side effects
//! - Canonical serialized form for cache keys
//! - Isolated translation into the vector index service's predicate syntax

use crate::{ChunkMetadata, CredibilityLevel, DocumentType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// One concrete filter constraint
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataFilter {
    DocumentTypes(Vec<DocumentType>),
    CredibilityLevels(Vec<CredibilityLevel>),
    Sources(Vec<String>),
    DateRange {
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    },
}

/// Filter set attached to a search query. All present kinds are applied
/// conjunctively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_types: Option<Vec<DocumentType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credibility_levels: Option<Vec<CredibilityLevel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<DateTime<Utc>>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.kinds().is_empty()
    }

    /// The typed filter kinds present in this set
    pub fn kinds(&self) -> Vec<MetadataFilter> {
        let mut kinds = Vec::new();
        if let Some(types) = &self.document_types {
            kinds.push(MetadataFilter::DocumentTypes(types.clone()));
        }
        if let Some(levels) = &self.credibility_levels {
            kinds.push(MetadataFilter::CredibilityLevels(levels.clone()));
        }
        if let Some(sources) = &self.sources {
            kinds.push(MetadataFilter::Sources(sources.clone()));
        }
        if self.date_from.is_some() || self.date_to.is_some() {
            kinds.push(MetadataFilter::DateRange {
                from: self.date_from,
                to: self.date_to,
            });
        }
        kinds
    }

    /// Evaluate all present filter kinds against candidate metadata.
    /// Pure function; returns true only when every kind matches.
    pub fn matches(&self, candidate: &ChunkMetadata) -> bool {
        self.kinds().iter().all(|kind| match kind {
            MetadataFilter::DocumentTypes(types) => types.contains(&candidate.document_type),
            MetadataFilter::CredibilityLevels(levels) => {
                levels.contains(&candidate.credibility_level)
            }
            MetadataFilter::Sources(sources) => sources.contains(&candidate.source),
            MetadataFilter::DateRange { from, to } => {
                from.map_or(true, |f| candidate.last_updated >= f)
                    && to.map_or(true, |t| candidate.last_updated <= t)
            }
        })
    }

    /// Deterministic serialized form used in cache keys. Struct field order
    /// is fixed, so identical filter sets always produce identical strings.
    pub fn canonical_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Translate the filter set into the predicate syntax the vector index
    /// service expects. The translation is isolated here so the index
    /// service can be swapped without touching search logic.
    pub fn to_index_predicate(&self) -> Option<Value> {
        let mut predicate = Map::new();

        for kind in self.kinds() {
            match kind {
                MetadataFilter::DocumentTypes(types) => {
                    predicate.insert("document_type".to_string(), json!({ "$in": types }));
                }
                MetadataFilter::CredibilityLevels(levels) => {
                    predicate.insert("credibility_level".to_string(), json!({ "$in": levels }));
                }
                MetadataFilter::Sources(sources) => {
                    predicate.insert("source".to_string(), json!({ "$in": sources }));
                }
                MetadataFilter::DateRange { from, to } => {
                    let mut range = Map::new();
                    if let Some(from) = from {
                        range.insert("$gte".to_string(), json!(from.timestamp()));
                    }
                    if let Some(to) = to {
                        range.insert("$lte".to_string(), json!(to.timestamp()));
                    }
                    predicate.insert("last_updated".to_string(), Value::Object(range));
                }
            }
        }

        if predicate.is_empty() {
            None
        } else {
            Some(Value::Object(predicate))
        }
    }

    /// Filter restricted to a single source, used for delete and patch
    pub fn for_source(source: &str) -> Self {
        Self {
            sources: Some(vec![source.to_string()]),
            ..Self::default()
        }
    }
}
