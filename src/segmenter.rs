//! # Text Segmentation Module
//!
//! ## Purpose
//! Context-preserving segmentation of medical documents into bounded chunks
//! with domain-term and key-concept annotations for indexing and retrieval.
//!
//! ## Input/Output Specification
//! - **Input**: Raw document text, chunking configuration
//! - **Output**: Ordered chunk sequence with extracted terms and concepts
//! - **Features**: Sentence packing, overlap windows, controlled vocabulary
//!
//! ## Key Features
//! - Sentence-boundary splitting with sliding-window fallback
//! - Greedy sentence packing up to the configured chunk size
//! - Backward-walk overlap so consecutive chunks share trailing context
//! - Clause-boundary splitting for sentences larger than a whole chunk
//! - Medical vocabulary matching grouped by term category
//! - Pluggable concept extraction with graceful degradation

use crate::config::ChunkingConfig;
use crate::utils::TextUtils;
use crate::{Chunk, ChunkMetadata, Document};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

/// Category of a controlled-vocabulary term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermCategory {
    Symptom,
    Condition,
    Medication,
    Procedure,
}

impl TermCategory {
    /// Singular label used when building context-enhanced queries
    pub fn label(self) -> &'static str {
        match self {
            TermCategory::Symptom => "symptom",
            TermCategory::Condition => "condition",
            TermCategory::Medication => "medication",
            TermCategory::Procedure => "procedure",
        }
    }
}

/// A vocabulary term matched in a piece of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedTerm {
    pub term: String,
    pub category: TermCategory,
}

/// Controlled medical vocabulary grouped by category
pub struct MedicalVocabulary {
    terms: Vec<(TermCategory, &'static str)>,
}

impl MedicalVocabulary {
    /// Build the vocabulary. Terms are stored lowercase and matched by
    /// substring against lowercased text.
    pub fn new() -> Self {
        let mut terms = Vec::new();

        let symptoms = [
            "fever", "headache", "nausea", "fatigue", "dizziness", "cough",
            "shortness of breath", "chest pain", "abdominal pain", "vomiting",
            "rash", "swelling", "palpitations", "blurred vision", "numbness",
        ];
        let conditions = [
            "diabetes", "hypertension", "asthma", "pneumonia", "influenza",
            "migraine", "anemia", "arthritis", "bronchitis", "sepsis",
            "stroke", "epilepsy", "hypothyroidism", "copd", "heart failure",
        ];
        let medications = [
            "metformin", "insulin", "ibuprofen", "paracetamol", "aspirin",
            "amoxicillin", "lisinopril", "atorvastatin", "albuterol",
            "warfarin", "prednisone", "omeprazole", "salbutamol",
        ];
        let procedures = [
            "biopsy", "dialysis", "endoscopy", "intubation", "vaccination",
            "transfusion", "catheterization", "angioplasty", "defibrillation",
            "colonoscopy", "appendectomy",
        ];

        for term in symptoms {
            terms.push((TermCategory::Symptom, term));
        }
        for term in conditions {
            terms.push((TermCategory::Condition, term));
        }
        for term in medications {
            terms.push((TermCategory::Medication, term));
        }
        for term in procedures {
            terms.push((TermCategory::Procedure, term));
        }

        Self { terms }
    }

    /// Extract all vocabulary terms present in the text
    pub fn extract_terms(&self, text: &str) -> Vec<MatchedTerm> {
        let lowered = text.to_lowercase();
        let mut matched = Vec::new();
        for (category, term) in &self.terms {
            if lowered.contains(term) {
                matched.push(MatchedTerm {
                    term: (*term).to_string(),
                    category: *category,
                });
            }
        }
        matched
    }
}

impl Default for MedicalVocabulary {
    fn default() -> Self {
        Self::new()
    }
}

/// Capability for linguistic key-concept extraction.
///
/// Chosen once at startup; callers never probe for model availability.
pub trait TextAnalyzer: Send + Sync {
    /// Extract noun phrases and entities from text
    fn extract_concepts(&self, text: &str) -> Vec<String>;
}

/// Regex-based entity and noun-phrase extraction
pub struct FullAnalyzer {
    phrase_regex: Regex,
    term_suffix_regex: Regex,
}

impl FullAnalyzer {
    pub fn new() -> Self {
        Self {
            // Multiword capitalized sequences (e.g. "Type 2 Diabetes Mellitus")
            phrase_regex: Regex::new(r"\b[A-Z][a-z]+(?:\s+(?:[A-Z][a-z]+|\d+))+\b")
                .expect("valid phrase regex"),
            // Clinical term morphology
            term_suffix_regex: Regex::new(
                r"\b\w+(?:itis|emia|osis|pathy|ectomy|oscopy|ology|algia)\b",
            )
            .expect("valid suffix regex"),
        }
    }
}

impl Default for FullAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextAnalyzer for FullAnalyzer {
    fn extract_concepts(&self, text: &str) -> Vec<String> {
        let mut concepts = BTreeSet::new();

        for mat in self.phrase_regex.find_iter(text) {
            concepts.insert(mat.as_str().to_string());
        }
        for mat in self.term_suffix_regex.find_iter(text) {
            concepts.insert(mat.as_str().to_lowercase());
        }

        concepts.into_iter().collect()
    }
}

/// Analyzer used when no linguistic model is available.
/// Returns empty concept sets rather than failing.
pub struct NullAnalyzer;

impl TextAnalyzer for NullAnalyzer {
    fn extract_concepts(&self, _text: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Select the analyzer once at startup based on configuration
pub fn analyzer_from_config(config: &ChunkingConfig) -> Arc<dyn TextAnalyzer> {
    if config.enable_concept_extraction {
        Arc::new(FullAnalyzer::new())
    } else {
        tracing::info!("Concept extraction disabled, key concepts will be empty");
        Arc::new(NullAnalyzer)
    }
}

/// Document chunker
pub struct TextSegmenter {
    config: ChunkingConfig,
    vocabulary: Arc<MedicalVocabulary>,
    analyzer: Arc<dyn TextAnalyzer>,
    sentence_boundary: Regex,
    clause_boundary: Regex,
}

impl TextSegmenter {
    /// Create a new segmenter
    pub fn new(
        config: ChunkingConfig,
        vocabulary: Arc<MedicalVocabulary>,
        analyzer: Arc<dyn TextAnalyzer>,
    ) -> Self {
        Self {
            config,
            vocabulary,
            analyzer,
            sentence_boundary: Regex::new(r"[.!?]+\s+").expect("valid sentence regex"),
            clause_boundary: Regex::new(r"(?:[,;:]\s+|\s+(?:and|but|or)\s+)")
                .expect("valid clause regex"),
        }
    }

    /// Split a document into ordered, bounded chunks.
    ///
    /// Pure function of the document text and the configured chunk size and
    /// overlap. Empty text yields zero chunks; text below the chunk size
    /// yields exactly one chunk with index 0.
    pub fn segment(&self, document: &Document) -> Vec<Chunk> {
        let normalized: String = document.content.nfc().collect();
        if normalized.trim().is_empty() {
            return Vec::new();
        }

        let units = self.split_units(&normalized);
        let texts = self.pack(units);

        let metadata = ChunkMetadata {
            source: document.source.clone(),
            title: document.title.clone(),
            document_type: document.document_type,
            credibility_level: document.credibility_level,
            last_updated: document.last_updated,
        };

        texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| self.build_chunk(text, index, metadata.clone()))
            .collect()
    }

    /// Vocabulary shared with the search path for query-term extraction
    pub fn vocabulary(&self) -> Arc<MedicalVocabulary> {
        self.vocabulary.clone()
    }

    fn build_chunk(&self, text: String, index: usize, metadata: ChunkMetadata) -> Chunk {
        let domain_terms: Vec<String> = self
            .vocabulary
            .extract_terms(&text)
            .into_iter()
            .map(|m| m.term)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let key_concepts = self.analyzer.extract_concepts(&text);

        let chunk_id = TextUtils::text_hash(&format!(
            "{}:{}:{}",
            metadata.source,
            index,
            TextUtils::leading(&text, 50)
        ));

        Chunk {
            chunk_id,
            chunk_index: index,
            text,
            domain_terms,
            key_concepts,
            metadata,
        }
    }

    /// Split text into packing units: sentences, with oversized sentences
    /// further split at clause boundaries. Units cover the input text in
    /// order so no characters are lost.
    fn split_units(&self, text: &str) -> Vec<String> {
        let sentences = self.split_covering(text, &self.sentence_boundary);

        // No sentence or clause structure at all: fall back to fixed windows
        if sentences.len() <= 1
            && text.len() > self.config.chunk_size
            && !self.clause_boundary.is_match(text)
        {
            return self.sliding_windows(text);
        }

        let mut units = Vec::new();
        for sentence in sentences {
            if sentence.len() > self.config.chunk_size {
                units.extend(self.split_oversized(&sentence));
            } else {
                units.push(sentence);
            }
        }
        units
    }

    /// Split text at regex boundaries, keeping the boundary text attached to
    /// the preceding segment so concatenating segments reconstructs the input.
    fn split_covering(&self, text: &str, boundary: &Regex) -> Vec<String> {
        let mut segments = Vec::new();
        let mut last = 0;
        for mat in boundary.find_iter(text) {
            segments.push(text[last..mat.end()].to_string());
            last = mat.end();
        }
        if last < text.len() {
            segments.push(text[last..].to_string());
        }
        segments
    }

    /// Break an oversized sentence at clause boundaries; clauses still above
    /// the chunk size are hard-split at the size limit.
    fn split_oversized(&self, sentence: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        for clause in self.split_covering(sentence, &self.clause_boundary) {
            if clause.len() <= self.config.chunk_size {
                pieces.push(clause);
            } else {
                pieces.extend(self.hard_split(&clause));
            }
        }
        pieces
    }

    fn hard_split(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut rest = text;
        while rest.len() > self.config.chunk_size {
            let mut cut = self.config.chunk_size;
            while !rest.is_char_boundary(cut) {
                cut -= 1;
            }
            pieces.push(rest[..cut].to_string());
            rest = &rest[cut..];
        }
        if !rest.is_empty() {
            pieces.push(rest.to_string());
        }
        pieces
    }

    /// Fixed-size sliding windows with the configured overlap, used when the
    /// text has no detectable sentence boundaries.
    fn sliding_windows(&self, text: &str) -> Vec<String> {
        let size = self.config.chunk_size;
        let step = size.saturating_sub(self.config.chunk_overlap).max(1);
        let chars: Vec<char> = text.chars().collect();

        let mut windows = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + size).min(chars.len());
            windows.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        windows
    }

    /// Greedily pack units into chunks; each new chunk starts with trailing
    /// units of the previous chunk covering at least the configured overlap.
    fn pack(&self, units: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_len = 0;

        for unit in units {
            if current_len + unit.len() > self.config.chunk_size && !current.is_empty() {
                chunks.push(current.concat());

                let overlap = self.overlap_tail(&current);
                current_len = overlap.iter().map(String::len).sum();
                current = overlap;
            }
            current_len += unit.len();
            current.push(unit);
        }

        if !current.is_empty() {
            chunks.push(current.concat());
        }
        chunks
    }

    /// Walk backward through packed units until at least `chunk_overlap`
    /// characters are covered. The tail must be a proper suffix of the chunk,
    /// otherwise the next chunk would fully contain this one.
    fn overlap_tail(&self, units: &[String]) -> Vec<String> {
        if self.config.chunk_overlap == 0 {
            return Vec::new();
        }

        let mut covered = 0;
        let mut tail = Vec::new();
        for unit in units.iter().rev() {
            if covered >= self.config.chunk_overlap {
                break;
            }
            covered += unit.len();
            tail.push(unit.clone());
        }
        if tail.len() >= units.len() {
            return Vec::new();
        }
        tail.reverse();
        tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::{CredibilityLevel, DocumentType};

    fn segmenter(chunk_size: usize, chunk_overlap: usize) -> TextSegmenter {
        TextSegmenter::new(
            ChunkingConfig {
                chunk_size,
                chunk_overlap,
                enable_concept_extraction: true,
            },
            Arc::new(MedicalVocabulary::new()),
            Arc::new(FullAnalyzer::new()),
        )
    }

    fn doc(content: &str) -> Document {
        Document {
            content: content.to_string(),
            source: "doc1".to_string(),
            title: "Test Document".to_string(),
            document_type: DocumentType::MedicalGuideline,
            credibility_level: CredibilityLevel::High,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_empty_document_yields_zero_chunks() {
        let chunks = segmenter(1000, 200).segment(&doc(""));
        assert!(chunks.is_empty());
        let chunks = segmenter(1000, 200).segment(&doc("   \n  "));
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_short_document_yields_single_chunk() {
        let chunks = segmenter(1000, 200).segment(&doc("Fever is a common symptom. Rest helps."));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn test_2500_char_document_yields_three_overlapping_chunks() {
        // 25 sentences of exactly 100 characters each
        let sentence = format!("{}. ", "x".repeat(98));
        assert_eq!(sentence.len(), 100);
        let content = sentence.repeat(25);
        assert_eq!(content.len(), 2500);

        let chunks = segmenter(1000, 200).segment(&doc(&content));
        assert_eq!(chunks.len(), 3);

        // Chunk 2 starts with roughly the overlap window of chunk 1's tail
        let tail_of_first: String = chunks[0]
            .text
            .chars()
            .skip(chunks[0].text.len() - 200)
            .collect();
        assert!(chunks[1].text.starts_with(&tail_of_first));
    }

    #[test]
    fn test_consecutive_chunks_cover_full_text() {
        let content = (0..40)
            .map(|i| format!("Sentence number {} talks about fever and diabetes. ", i))
            .collect::<String>();
        let seg = segmenter(300, 60);
        let chunks = seg.segment(&doc(&content));
        assert!(chunks.len() > 1);

        // Dropping each chunk's overlap prefix and concatenating the rest
        // reconstructs the original text.
        let mut rebuilt = chunks[0].text.clone();
        for pair in chunks.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let mut shared = 0;
            for end in (0..=next.text.len()).rev() {
                if prev.text.ends_with(&next.text[..end]) {
                    shared = end;
                    break;
                }
            }
            rebuilt.push_str(&next.text[shared..]);
        }
        assert_eq!(rebuilt, content);
    }

    #[test]
    fn test_oversized_sentence_is_clause_split() {
        let content = format!(
            "{}, {}, and {}.",
            "a".repeat(150),
            "b".repeat(150),
            "c".repeat(150)
        );
        let chunks = segmenter(200, 40).segment(&doc(&content));
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.len() <= 400, "chunk too large: {}", chunk.text.len());
        }
    }

    #[test]
    fn test_unbroken_text_uses_sliding_windows() {
        let content = "x".repeat(2500);
        let chunks = segmenter(1000, 200).segment(&doc(&content));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text.len(), 1000);
        assert_eq!(chunks[1].text.len(), 1000);
    }

    #[test]
    fn test_domain_terms_extracted() {
        let chunks =
            segmenter(1000, 200).segment(&doc("Metformin is first-line for diabetes. Watch for nausea."));
        assert_eq!(chunks.len(), 1);
        let terms = &chunks[0].domain_terms;
        assert!(terms.contains(&"metformin".to_string()));
        assert!(terms.contains(&"diabetes".to_string()));
        assert!(terms.contains(&"nausea".to_string()));
    }

    #[test]
    fn test_null_analyzer_yields_empty_concepts() {
        let seg = TextSegmenter::new(
            ChunkingConfig {
                chunk_size: 1000,
                chunk_overlap: 200,
                enable_concept_extraction: false,
            },
            Arc::new(MedicalVocabulary::new()),
            Arc::new(NullAnalyzer),
        );
        let chunks = seg.segment(&doc("Acute Myocardial Infarction requires rapid response."));
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].key_concepts.is_empty());
    }

    #[test]
    fn test_full_analyzer_extracts_concepts() {
        let analyzer = FullAnalyzer::new();
        let concepts = analyzer.extract_concepts(
            "Acute Myocardial Infarction and nephritis are covered by this protocol.",
        );
        assert!(concepts.iter().any(|c| c == "Acute Myocardial Infarction"));
        assert!(concepts.iter().any(|c| c == "nephritis"));
    }

    #[test]
    fn test_chunk_ids_stable_across_reingestion() {
        let seg = segmenter(1000, 200);
        let content = "Hypertension management. ".repeat(80);
        let first: Vec<String> = seg.segment(&doc(&content)).into_iter().map(|c| c.chunk_id).collect();
        let second: Vec<String> = seg.segment(&doc(&content)).into_iter().map(|c| c.chunk_id).collect();
        assert_eq!(first, second);
        let unique: std::collections::HashSet<_> = first.iter().collect();
        assert_eq!(unique.len(), first.len());
    }

    #[test]
    fn test_query_term_extraction() {
        let vocab = MedicalVocabulary::new();
        let matched = vocab.extract_terms("diabetes symptoms and fever");
        let categories: Vec<TermCategory> = matched.iter().map(|m| m.category).collect();
        assert!(categories.contains(&TermCategory::Condition));
        assert!(categories.contains(&TermCategory::Symptom));
    }
}
