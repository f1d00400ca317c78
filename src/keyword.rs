//! # Keyword Index Module
//!
//! ## Purpose
//! In-process lexical index over the ingested chunk corpus using a
//! TF-IDF vector space with cosine similarity, complementing semantic
//! vector search with exact-term matching.
//!
//! ## Input/Output Specification
//! - **Input**: Chunk corpus (rebuild), query text (lookup)
//! - **Output**: Chunks ranked by lexical similarity in [0, 1]
//! - **Rebuild**: Full rebuild-and-swap, never mutated in place
//!
//! ## Key Features
//! - TF-IDF weighting with smoothed inverse document frequency
//! - Cosine similarity between L2-normalized sparse vectors
//! - Atomic snapshot swap so concurrent queries always see a
//!   complete, consistent index
//! - Parallel vectorization during rebuild

use crate::Chunk;
use parking_lot::RwLock;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// A lexical match from the keyword index
#[derive(Debug, Clone)]
pub struct KeywordMatch {
    pub chunk: Arc<Chunk>,
    pub score: f32,
}

/// Immutable fitted TF-IDF model over one corpus generation
struct TfIdfSnapshot {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    documents: Vec<DocumentVector>,
}

struct DocumentVector {
    chunk: Arc<Chunk>,
    /// term index -> L2-normalized tf-idf weight
    weights: HashMap<usize, f32>,
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn term_frequencies(text: &str) -> HashMap<String, usize> {
    let mut tf = HashMap::new();
    for token in tokenize(text) {
        *tf.entry(token).or_insert(0) += 1;
    }
    tf
}

impl TfIdfSnapshot {
    fn empty() -> Self {
        Self {
            vocabulary: HashMap::new(),
            idf: Vec::new(),
            documents: Vec::new(),
        }
    }

    fn build(chunks: &[Arc<Chunk>]) -> Self {
        if chunks.is_empty() {
            return Self::empty();
        }

        let frequencies: Vec<HashMap<String, usize>> = chunks
            .par_iter()
            .map(|chunk| term_frequencies(&chunk.text))
            .collect();

        // Fit vocabulary and document frequencies
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut document_frequency: Vec<usize> = Vec::new();
        for tf in &frequencies {
            for term in tf.keys() {
                match vocabulary.get(term) {
                    Some(&idx) => document_frequency[idx] += 1,
                    None => {
                        vocabulary.insert(term.clone(), document_frequency.len());
                        document_frequency.push(1);
                    }
                }
            }
        }

        let corpus_size = chunks.len() as f32;
        let idf: Vec<f32> = document_frequency
            .iter()
            .map(|&df| 1.0 + ((1.0 + corpus_size) / (1.0 + df as f32)).ln())
            .collect();

        let documents: Vec<DocumentVector> = chunks
            .par_iter()
            .zip(frequencies.par_iter())
            .map(|(chunk, tf)| DocumentVector {
                chunk: chunk.clone(),
                weights: vectorize(tf, &vocabulary, &idf),
            })
            .collect();

        Self {
            vocabulary,
            idf,
            documents,
        }
    }

    fn query(&self, text: &str, top_k: usize) -> Vec<KeywordMatch> {
        if self.documents.is_empty() {
            return Vec::new();
        }

        let query_weights = vectorize(&term_frequencies(text), &self.vocabulary, &self.idf);
        if query_weights.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<KeywordMatch> = self
            .documents
            .iter()
            .filter_map(|doc| {
                let score = cosine(&query_weights, &doc.weights);
                (score > 0.0).then(|| KeywordMatch {
                    chunk: doc.chunk.clone(),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        scored
    }
}

/// Build an L2-normalized tf-idf weight vector using the fitted vocabulary.
/// Terms outside the vocabulary are ignored.
fn vectorize(
    tf: &HashMap<String, usize>,
    vocabulary: &HashMap<String, usize>,
    idf: &[f32],
) -> HashMap<usize, f32> {
    let mut weights: HashMap<usize, f32> = HashMap::new();
    for (term, &count) in tf {
        if let Some(&idx) = vocabulary.get(term) {
            weights.insert(idx, count as f32 * idf[idx]);
        }
    }

    let norm: f32 = weights.values().map(|w| w * w).sum::<f32>().sqrt();
    if norm > 0.0 {
        for weight in weights.values_mut() {
            *weight /= norm;
        }
    }
    weights
}

/// Dot product of two L2-normalized sparse vectors
fn cosine(a: &HashMap<usize, f32>, b: &HashMap<usize, f32>) -> f32 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(idx, wa)| large.get(idx).map(|wb| wa * wb))
        .sum()
}

/// Concurrent handle over the active TF-IDF snapshot.
///
/// Queries clone the active `Arc` and work against that generation; a
/// rebuild installs a fresh snapshot atomically, so no query ever observes
/// a partially built index.
pub struct KeywordIndex {
    active: RwLock<Arc<TfIdfSnapshot>>,
}

impl KeywordIndex {
    pub fn new() -> Self {
        Self {
            active: RwLock::new(Arc::new(TfIdfSnapshot::empty())),
        }
    }

    /// Rebuild the index from the full chunk corpus and swap it in
    pub fn rebuild(&self, chunks: &[Arc<Chunk>]) {
        let snapshot = Arc::new(TfIdfSnapshot::build(chunks));
        tracing::debug!(
            corpus = chunks.len(),
            vocabulary = snapshot.vocabulary.len(),
            "keyword index rebuilt"
        );
        *self.active.write() = snapshot;
    }

    /// Rank chunks by lexical similarity to the query text
    pub fn query(&self, text: &str, top_k: usize) -> Vec<KeywordMatch> {
        let snapshot = self.active.read().clone();
        snapshot.query(text, top_k)
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.active.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for KeywordIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChunkMetadata, CredibilityLevel, DocumentType};
    use chrono::Utc;

    fn chunk(source: &str, text: &str) -> Arc<Chunk> {
        Arc::new(Chunk {
            chunk_id: format!("{}-0", source),
            chunk_index: 0,
            text: text.to_string(),
            domain_terms: Vec::new(),
            key_concepts: Vec::new(),
            metadata: ChunkMetadata {
                source: source.to_string(),
                title: source.to_string(),
                document_type: DocumentType::MedicalGuideline,
                credibility_level: CredibilityLevel::High,
                last_updated: Utc::now(),
            },
        })
    }

    #[test]
    fn test_empty_index_returns_no_matches() {
        let index = KeywordIndex::new();
        assert!(index.query("diabetes", 10).is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_relevant_document_ranks_first() {
        let index = KeywordIndex::new();
        index.rebuild(&[
            chunk("doc1", "Diabetes symptoms include thirst and fatigue"),
            chunk("doc2", "Asthma inhaler technique for children"),
            chunk("doc3", "Managing diabetes with diet and metformin"),
        ]);

        let matches = index.query("diabetes symptoms", 10);
        assert!(!matches.is_empty());
        assert_eq!(matches[0].chunk.metadata.source, "doc1");
        assert!(matches.iter().all(|m| m.score > 0.0 && m.score <= 1.0 + 1e-6));
        assert!(!matches.iter().any(|m| m.chunk.metadata.source == "doc2"));
    }

    #[test]
    fn test_identical_text_scores_near_one() {
        let index = KeywordIndex::new();
        index.rebuild(&[
            chunk("doc1", "metformin dosage guidance"),
            chunk("doc2", "stroke rehabilitation exercises"),
        ]);

        let matches = index.query("metformin dosage guidance", 1);
        assert_eq!(matches.len(), 1);
        assert!((matches[0].score - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_unknown_terms_yield_no_matches() {
        let index = KeywordIndex::new();
        index.rebuild(&[chunk("doc1", "hypertension management protocol")]);
        assert!(index.query("zzzzz qqqqq", 10).is_empty());
    }

    #[test]
    fn test_rebuild_swaps_snapshot() {
        let index = KeywordIndex::new();
        index.rebuild(&[chunk("doc1", "sepsis early warning signs")]);
        assert_eq!(index.len(), 1);

        index.rebuild(&[
            chunk("doc2", "influenza vaccination schedule"),
            chunk("doc3", "pneumonia antibiotic selection"),
        ]);
        assert_eq!(index.len(), 2);
        assert!(index.query("sepsis", 10).is_empty());
        assert!(!index.query("influenza", 10).is_empty());
    }

    #[test]
    fn test_top_k_truncation() {
        let index = KeywordIndex::new();
        let chunks: Vec<Arc<Chunk>> = (0..10)
            .map(|i| chunk(&format!("doc{}", i), "fever management in adults"))
            .collect();
        index.rebuild(&chunks);
        assert_eq!(index.query("fever", 3).len(), 3);
    }
}
