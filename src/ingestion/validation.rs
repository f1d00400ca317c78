//! # Document Validation Module
//!
//! ## Purpose
//! Validates documents before chunking and indexing so malformed input is
//! rejected without touching the embedding or index services.
//!
//! ## Input/Output Specification
//! - **Input**: Documents submitted for ingestion
//! - **Output**: Pass/fail with a field-level reason
//! - **Validation Rules**: Non-empty source and content, bounded lengths

use crate::errors::{Result, RetrievalError};
use crate::Document;

/// Upper bound on document content length in characters
const MAX_CONTENT_LENGTH: usize = 1_000_000;

/// Upper bound on title length in characters
const MAX_TITLE_LENGTH: usize = 512;

/// Document validator
pub struct DocumentValidator;

impl DocumentValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a document against all rules
    pub fn validate(&self, document: &Document) -> Result<()> {
        if document.source.trim().is_empty() {
            return Err(RetrievalError::ValidationFailed {
                field: "source".to_string(),
                reason: "Document source must not be empty".to_string(),
            });
        }

        if document.content.trim().is_empty() {
            return Err(RetrievalError::ValidationFailed {
                field: "content".to_string(),
                reason: "Document content must not be empty".to_string(),
            });
        }

        if document.content.len() > MAX_CONTENT_LENGTH {
            return Err(RetrievalError::ValidationFailed {
                field: "content".to_string(),
                reason: format!(
                    "Document content exceeds {} characters",
                    MAX_CONTENT_LENGTH
                ),
            });
        }

        if document.title.len() > MAX_TITLE_LENGTH {
            return Err(RetrievalError::ValidationFailed {
                field: "title".to_string(),
                reason: format!("Document title exceeds {} characters", MAX_TITLE_LENGTH),
            });
        }

        Ok(())
    }
}

impl Default for DocumentValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CredibilityLevel, DocumentType};
    use chrono::Utc;

    fn document(source: &str, content: &str) -> Document {
        Document {
            content: content.to_string(),
            source: source.to_string(),
            title: "Title".to_string(),
            document_type: DocumentType::PatientEducation,
            credibility_level: CredibilityLevel::Medium,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_valid_document_passes() {
        let validator = DocumentValidator::new();
        assert!(validator.validate(&document("doc1", "Some content")).is_ok());
    }

    #[test]
    fn test_empty_source_rejected() {
        let validator = DocumentValidator::new();
        assert!(validator.validate(&document("  ", "Some content")).is_err());
    }

    #[test]
    fn test_empty_content_rejected() {
        let validator = DocumentValidator::new();
        assert!(validator.validate(&document("doc1", "   ")).is_err());
    }
}
