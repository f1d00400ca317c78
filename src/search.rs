//! # Search Orchestrator Module
//!
//! ## Purpose
//! Main search engine combining semantic vector search with TF-IDF keyword
//! search across four strategies: vector-only, keyword-only, hybrid fusion
//! and context-enhanced semantic search.
//!
//! ## Input/Output Specification
//! - **Input**: Search queries with strategy, filters and result bounds
//! - **Output**: Ranked, filtered, cached search results
//! - **Ordering**: Relevance descending, ties by raw score then source
//!
//! ## Key Features
//! - Query validation before any I/O
//! - Weighted score fusion rewarding dual-strategy agreement
//! - Domain-term query enhancement with overlap boosting
//! - Uniform credibility-aware confidence scoring
//! - TTL result caching keyed by the full request shape
//!
//! Sub-queries run concurrently within a request; dropping the request
//! future cancels them cooperatively.

use crate::cache::{cache_key, CacheStats, ResultCache};
use crate::config::SearchEngineConfig;
use crate::embedding::EmbeddingProvider;
use crate::errors::{Result, RetrievalError};
use crate::filter::SearchFilters;
use crate::keyword::{KeywordIndex, KeywordMatch};
use crate::segmenter::MedicalVocabulary;
use crate::utils::{TextUtils, Timer};
use crate::vector_index::{VectorIndex, VectorMatch};
use crate::{ChunkMetadata, CredibilityLevel, DocumentType, IndexStatistics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Search strategy requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchType {
    VectorOnly,
    KeywordOnly,
    Hybrid,
    Semantic,
}

impl SearchType {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchType::VectorOnly => "vector-only",
            SearchType::KeywordOnly => "keyword-only",
            SearchType::Hybrid => "hybrid",
            SearchType::Semantic => "semantic",
        }
    }
}

fn default_max_results() -> usize {
    10
}

fn default_min_score() -> f32 {
    0.5
}

/// Search request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Query text (1-1000 characters)
    pub query: String,
    /// Search strategy
    pub search_type: SearchType,
    /// Metadata filters, applied conjunctively
    #[serde(default)]
    pub filters: SearchFilters,
    /// Maximum number of results (1-100)
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Minimum relevance score for returned results
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    /// Include domain terms and key concepts in results
    #[serde(default)]
    pub include_metadata: bool,
}

/// Extracted analysis metadata attached to a result on request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub domain_terms: Vec<String>,
    pub key_concepts: Vec<String>,
}

/// One ranked search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub text: String,
    pub source: String,
    pub title: String,
    /// Raw strategy score
    pub score: f32,
    pub document_type: DocumentType,
    pub credibility_level: CredibilityLevel,
    pub last_updated: DateTime<Utc>,
    /// Post-fusion/boost score, always in [0, 1]
    pub relevance_score: f32,
    /// Relevance adjusted by the credibility boost, always in [0, 1]
    pub confidence_score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResultMetadata>,
}

/// Search response returned to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total_results: usize,
    pub search_time_seconds: f64,
    pub query: SearchQuery,
}

/// Engine statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEngineStats {
    pub keyword_indexed_chunks: usize,
    pub cache: CacheStats,
    pub vector_index: IndexStatistics,
}

fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Main search engine
pub struct SearchEngine {
    config: SearchEngineConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    vector_index: Arc<dyn VectorIndex>,
    keyword_index: Arc<KeywordIndex>,
    vocabulary: Arc<MedicalVocabulary>,
    cache: Arc<ResultCache>,
}

impl SearchEngine {
    pub fn new(
        config: SearchEngineConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        vector_index: Arc<dyn VectorIndex>,
        keyword_index: Arc<KeywordIndex>,
        vocabulary: Arc<MedicalVocabulary>,
        cache: Arc<ResultCache>,
    ) -> Self {
        Self {
            config,
            embedder,
            vector_index,
            keyword_index,
            vocabulary,
            cache,
        }
    }

    /// Execute a search request
    pub async fn search(&self, query: SearchQuery) -> Result<SearchResponse> {
        let timer = Timer::new("search");

        self.validate_query(&query)?;

        let key = cache_key(&query);
        if self.config.enable_query_cache {
            if let Some(results) = self.cache.get(key) {
                tracing::debug!(query = %ResultCache::describe(&query), "cache hit");
                return Ok(self.respond(results, query, &timer));
            }
        }

        let mut results = match query.search_type {
            SearchType::VectorOnly => {
                self.vector_search(&query.query, &query.filters, query.include_metadata)
                    .await?
            }
            SearchType::KeywordOnly => self.keyword_search(&query.query, query.include_metadata),
            SearchType::Hybrid => self.hybrid_search(&query).await?,
            SearchType::Semantic => self.semantic_search(&query).await?,
        };

        results.retain(|r| r.relevance_score >= query.min_score);
        results.retain(|r| query.filters.matches(&result_metadata(r)));
        sort_results(&mut results);
        results.truncate(query.max_results);

        if self.config.enable_query_cache {
            self.cache.put(key, results.clone());
        }

        Ok(self.respond(results, query, &timer))
    }

    /// Engine statistics for monitoring endpoints
    pub async fn get_stats(&self) -> Result<SearchEngineStats> {
        Ok(SearchEngineStats {
            keyword_indexed_chunks: self.keyword_index.len(),
            cache: self.cache.stats(),
            vector_index: self.vector_index.describe_stats().await?,
        })
    }

    /// Vector index statistics passthrough
    pub async fn index_statistics(&self) -> Result<IndexStatistics> {
        self.vector_index.describe_stats().await
    }

    fn respond(&self, results: Vec<SearchResult>, query: SearchQuery, timer: &Timer) -> SearchResponse {
        SearchResponse {
            total_results: results.len(),
            results,
            search_time_seconds: timer.elapsed_seconds(),
            query,
        }
    }

    /// Reject malformed queries before any I/O
    fn validate_query(&self, query: &SearchQuery) -> Result<()> {
        let trimmed = query.query.trim();
        if trimmed.is_empty() || trimmed.len() < self.config.min_query_length {
            return Err(RetrievalError::ValidationFailed {
                field: "query".to_string(),
                reason: "Query text must not be empty".to_string(),
            });
        }
        if query.query.len() > self.config.max_query_length {
            return Err(RetrievalError::ValidationFailed {
                field: "query".to_string(),
                reason: format!(
                    "Query too long: maximum {} characters",
                    self.config.max_query_length
                ),
            });
        }
        if !(1..=100).contains(&query.max_results) {
            return Err(RetrievalError::ValidationFailed {
                field: "max_results".to_string(),
                reason: "max_results must be between 1 and 100".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&query.min_score) {
            return Err(RetrievalError::ValidationFailed {
                field: "min_score".to_string(),
                reason: "min_score must be between 0.0 and 1.0".to_string(),
            });
        }
        Ok(())
    }

    async fn vector_search(
        &self,
        text: &str,
        filters: &SearchFilters,
        include_metadata: bool,
    ) -> Result<Vec<SearchResult>> {
        let vector = self.embedder.embed(text).await?;
        let matches = self
            .vector_index
            .query(
                vector,
                self.config.candidate_pool_size,
                filters.to_index_predicate(),
            )
            .await?;

        Ok(matches
            .into_iter()
            .map(|m| result_from_vector(m, include_metadata))
            .collect())
    }

    fn keyword_search(&self, text: &str, include_metadata: bool) -> Vec<SearchResult> {
        self.keyword_index
            .query(text, self.config.candidate_pool_size)
            .into_iter()
            .map(|m| result_from_keyword(m, self.config.lexical_confidence_base, include_metadata))
            .collect()
    }

    /// Run vector and keyword search concurrently, then fuse by
    /// (source, leading text) key
    async fn hybrid_search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let (vector_results, keyword_results) = tokio::join!(
            self.vector_search(&query.query, &query.filters, query.include_metadata),
            async { self.keyword_search(&query.query, query.include_metadata) }
        );

        Ok(self.fuse(vector_results?, keyword_results))
    }

    /// Weighted fusion. Results found by both strategies combine their
    /// scores; single-strategy hits are down-weighted by the other
    /// strategy's weight so dual agreement dominates the ranking.
    fn fuse(
        &self,
        vector_results: Vec<SearchResult>,
        keyword_results: Vec<SearchResult>,
    ) -> Vec<SearchResult> {
        struct FusionEntry {
            result: SearchResult,
            vector_score: Option<f32>,
            keyword_score: Option<f32>,
        }

        let mut entries: HashMap<(String, String), FusionEntry> = HashMap::new();

        for result in vector_results {
            entries.insert(
                fusion_key(&result),
                FusionEntry {
                    vector_score: Some(result.score),
                    keyword_score: None,
                    result,
                },
            );
        }
        for result in keyword_results {
            match entries.get_mut(&fusion_key(&result)) {
                Some(entry) => entry.keyword_score = Some(result.score),
                None => {
                    entries.insert(
                        fusion_key(&result),
                        FusionEntry {
                            vector_score: None,
                            keyword_score: Some(result.score),
                            result,
                        },
                    );
                }
            }
        }

        let (vw, kw) = (self.config.vector_weight, self.config.keyword_weight);
        entries
            .into_values()
            .map(|entry| {
                let combined = match (entry.vector_score, entry.keyword_score) {
                    (Some(v), Some(k)) => vw * v + kw * k,
                    (Some(v), None) => v * kw,
                    (None, Some(k)) => k * vw,
                    (None, None) => 0.0,
                };
                let mut result = entry.result;
                result.score = clamp01(combined);
                result.relevance_score = result.score;
                result.confidence_score =
                    clamp01(result.relevance_score + result.credibility_level.boost());
                result
            })
            .collect()
    }

    /// Context-enhanced vector search: append a category-labelled suffix for
    /// each domain term in the query, then boost results sharing those terms.
    async fn semantic_search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let matched = self.vocabulary.extract_terms(&query.query);
        let enhanced = if matched.is_empty() {
            query.query.clone()
        } else {
            let suffix: Vec<String> = matched
                .iter()
                .map(|m| format!("{} {}", m.category.label(), m.term))
                .collect();
            format!("{} {}", query.query, suffix.join(" "))
        };

        let mut results = self
            .vector_search(&enhanced, &query.filters, true)
            .await?;

        let query_terms: Vec<&str> = matched.iter().map(|m| m.term.as_str()).collect();
        for result in &mut results {
            let overlap = result
                .metadata
                .as_ref()
                .map(|m| {
                    m.domain_terms
                        .iter()
                        .filter(|t| query_terms.contains(&t.as_str()))
                        .count()
                })
                .unwrap_or(0);

            let boosted =
                result.relevance_score * (1.0 + self.config.semantic_boost_step * overlap as f32);
            result.relevance_score = clamp01(boosted);
            result.confidence_score =
                clamp01(result.relevance_score + result.credibility_level.boost());
            if !query.include_metadata {
                result.metadata = None;
            }
        }

        Ok(results)
    }
}

fn fusion_key(result: &SearchResult) -> (String, String) {
    (
        result.source.clone(),
        TextUtils::leading(&result.text, 100).to_string(),
    )
}

fn result_metadata(result: &SearchResult) -> ChunkMetadata {
    ChunkMetadata {
        source: result.source.clone(),
        title: result.title.clone(),
        document_type: result.document_type,
        credibility_level: result.credibility_level,
        last_updated: result.last_updated,
    }
}

fn result_from_vector(m: VectorMatch, include_metadata: bool) -> SearchResult {
    let score = clamp01(m.score);
    SearchResult {
        text: m.metadata.text,
        source: m.metadata.source,
        title: m.metadata.title,
        score,
        document_type: m.metadata.document_type,
        credibility_level: m.metadata.credibility_level,
        last_updated: m.metadata.last_updated,
        relevance_score: score,
        confidence_score: clamp01(score + m.metadata.credibility_level.boost()),
        metadata: include_metadata.then(|| ResultMetadata {
            domain_terms: m.metadata.domain_terms,
            key_concepts: m.metadata.key_concepts,
        }),
    }
}

fn result_from_keyword(
    m: KeywordMatch,
    lexical_confidence_base: f32,
    include_metadata: bool,
) -> SearchResult {
    let score = clamp01(m.score);
    SearchResult {
        text: m.chunk.text.clone(),
        source: m.chunk.metadata.source.clone(),
        title: m.chunk.metadata.title.clone(),
        score,
        document_type: m.chunk.metadata.document_type,
        credibility_level: m.chunk.metadata.credibility_level,
        last_updated: m.chunk.metadata.last_updated,
        relevance_score: score,
        confidence_score: clamp01(
            lexical_confidence_base + m.chunk.metadata.credibility_level.boost(),
        ),
        metadata: include_metadata.then(|| ResultMetadata {
            domain_terms: m.chunk.domain_terms.clone(),
            key_concepts: m.chunk.key_concepts.clone(),
        }),
    }
}

/// Relevance descending; ties by raw score descending, then source
/// ascending for deterministic output
fn sort_results(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(a.source.cmp(&b.source))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchEngineConfig;
    use crate::vector_index::{VectorRecord, VectorRecordMetadata};
    use crate::{Chunk, IndexStatistics};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StubEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0.1; 4])
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    struct StubVectorIndex {
        matches: Vec<VectorMatch>,
        query_calls: AtomicUsize,
    }

    #[async_trait]
    impl VectorIndex for StubVectorIndex {
        async fn upsert(&self, _records: Vec<VectorRecord>) -> Result<()> {
            Ok(())
        }

        async fn query(
            &self,
            _vector: Vec<f32>,
            _top_k: usize,
            _filter: Option<Value>,
        ) -> Result<Vec<VectorMatch>> {
            self.query_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.matches.clone())
        }

        async fn delete_by_filter(&self, _filter: Value) -> Result<()> {
            Ok(())
        }

        async fn patch_metadata(&self, _filter: Value, _updates: Value) -> Result<()> {
            Ok(())
        }

        async fn describe_stats(&self) -> Result<IndexStatistics> {
            Ok(IndexStatistics {
                total_vector_count: self.matches.len(),
                dimension: 4,
                index_fullness: 0.0,
                namespaces: Default::default(),
            })
        }
    }

    fn vector_match(source: &str, text: &str, score: f32, terms: &[&str]) -> VectorMatch {
        VectorMatch {
            id: format!("{}-{}", source, TextUtils::text_hash(text)),
            score,
            metadata: VectorRecordMetadata {
                text: text.to_string(),
                source: source.to_string(),
                title: source.to_string(),
                document_type: DocumentType::MedicalGuideline,
                credibility_level: CredibilityLevel::Medium,
                last_updated: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
                chunk_index: 0,
                domain_terms: terms.iter().map(|t| t.to_string()).collect(),
                key_concepts: Vec::new(),
            },
        }
    }

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
                credibility_level: CredibilityLevel::Medium,
                last_updated: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            },
        })
    }

    struct Harness {
        engine: SearchEngine,
        embedder: Arc<StubEmbedder>,
        vector_index: Arc<StubVectorIndex>,
        keyword_index: Arc<KeywordIndex>,
    }

    fn harness(matches: Vec<VectorMatch>) -> Harness {
        let embedder = Arc::new(StubEmbedder {
            calls: AtomicUsize::new(0),
        });
        let vector_index = Arc::new(StubVectorIndex {
            matches,
            query_calls: AtomicUsize::new(0),
        });
        let keyword_index = Arc::new(KeywordIndex::new());
        let engine = SearchEngine::new(
            SearchEngineConfig {
                default_max_results: 10,
                default_min_score: 0.5,
                candidate_pool_size: 50,
                vector_weight: 0.7,
                keyword_weight: 0.3,
                semantic_boost_step: 0.1,
                lexical_confidence_base: 0.6,
                enable_query_cache: true,
                query_cache_size: 100,
                cache_ttl_seconds: 300,
                min_query_length: 1,
                max_query_length: 1000,
            },
            embedder.clone(),
            vector_index.clone(),
            keyword_index.clone(),
            Arc::new(MedicalVocabulary::new()),
            Arc::new(ResultCache::new(100, Duration::from_secs(300))),
        );
        Harness {
            engine,
            embedder,
            vector_index,
            keyword_index,
        }
    }

    fn query(text: &str, search_type: SearchType) -> SearchQuery {
        SearchQuery {
            query: text.to_string(),
            search_type,
            filters: SearchFilters::default(),
            max_results: 10,
            min_score: 0.5,
            include_metadata: false,
        }
    }

    #[tokio::test]
    async fn test_validation_rejects_before_any_io() {
        let h = harness(vec![]);

        let empty = query("  ", SearchType::VectorOnly);
        assert!(matches!(
            h.engine.search(empty).await,
            Err(RetrievalError::ValidationFailed { .. })
        ));

        let mut bad_bounds = query("diabetes", SearchType::VectorOnly);
        bad_bounds.max_results = 0;
        assert!(h.engine.search(bad_bounds).await.is_err());

        let mut bad_score = query("diabetes", SearchType::VectorOnly);
        bad_score.min_score = 1.5;
        assert!(h.engine.search(bad_score).await.is_err());

        assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.vector_index.query_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_vector_search_maps_scores_and_boosts_confidence() {
        let h = harness(vec![
            vector_match("doc1", "Diabetes management guidance", 0.9, &[]),
            vector_match("doc2", "Unrelated note", 0.3, &[]),
        ]);

        let response = h
            .engine
            .search(query("diabetes", SearchType::VectorOnly))
            .await
            .unwrap();

        // 0.3 falls below min_score
        assert_eq!(response.total_results, 1);
        let top = &response.results[0];
        assert!((top.score - 0.9).abs() < 1e-6);
        assert!((top.relevance_score - 0.9).abs() < 1e-6);
        // Medium credibility adds 0.1, clamped to 1.0
        assert!((top.confidence_score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_hybrid_fusion_combines_dual_strategy_scores() {
        let text = "Diabetes symptoms include excessive thirst and fatigue";
        let h = harness(vec![vector_match("doc1", text, 0.9, &[])]);

        // Make the same (source, text) discoverable by the keyword index
        h.keyword_index.rebuild(&[chunk("doc1", text)]);

        let mut results = h.engine.fuse(
            vec![result_from_vector(
                vector_match("doc1", text, 0.9, &[]),
                false,
            )],
            vec![result_from_keyword(
                KeywordMatch {
                    chunk: chunk("doc1", text),
                    score: 0.6,
                },
                0.6,
                false,
            )],
        );
        sort_results(&mut results);

        assert_eq!(results.len(), 1);
        assert!((results[0].score - 0.81).abs() < 1e-6);
        assert!((results[0].relevance_score - 0.81).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_hybrid_single_strategy_hits_are_down_weighted() {
        let h = harness(vec![]);
        let results = h.engine.fuse(
            vec![result_from_vector(
                vector_match("doc1", "vector only text", 0.8, &[]),
                false,
            )],
            vec![result_from_keyword(
                KeywordMatch {
                    chunk: chunk("doc2", "keyword only text"),
                    score: 0.8,
                },
                0.6,
                false,
            )],
        );

        let vector_only = results.iter().find(|r| r.source == "doc1").unwrap();
        let keyword_only = results.iter().find(|r| r.source == "doc2").unwrap();
        // Each exclusive hit is multiplied by the other strategy's weight
        assert!((vector_only.relevance_score - 0.8 * 0.3).abs() < 1e-6);
        assert!((keyword_only.relevance_score - 0.8 * 0.7).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_hybrid_ordering_is_non_increasing() {
        let text_a = "Hybrid search covers diabetes treatment options";
        let text_b = "Asthma action plans for school settings";
        let h = harness(vec![
            vector_match("doc1", text_a, 0.92, &[]),
            vector_match("doc2", text_b, 0.78, &[]),
        ]);
        h.keyword_index
            .rebuild(&[chunk("doc1", text_a), chunk("doc2", text_b)]);

        let mut q = query("diabetes treatment", SearchType::Hybrid);
        q.min_score = 0.0;
        let response = h.engine.search(q).await.unwrap();

        assert!(!response.results.is_empty());
        for pair in response.results.windows(2) {
            assert!(pair[0].relevance_score >= pair[1].relevance_score);
        }
        for result in &response.results {
            assert!((0.0..=1.0).contains(&result.relevance_score));
            assert!((0.0..=1.0).contains(&result.confidence_score));
        }
    }

    #[tokio::test]
    async fn test_semantic_search_boosts_term_overlap() {
        let h = harness(vec![vector_match(
            "doc1",
            "Diabetes and fever interactions",
            0.7,
            &["diabetes", "fever"],
        )]);

        let response = h
            .engine
            .search(query("diabetes fever advice", SearchType::Semantic))
            .await
            .unwrap();

        assert_eq!(response.total_results, 1);
        // Two overlapping terms: 0.7 * (1 + 0.1*2) = 0.84
        assert!((response.results[0].relevance_score - 0.84).abs() < 1e-5);
        // Raw strategy score is preserved
        assert!((response.results[0].score - 0.7).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_keyword_only_uses_lexical_confidence_base() {
        let h = harness(vec![]);
        h.keyword_index
            .rebuild(&[chunk("doc1", "metformin dosage guidance for adults")]);

        let mut q = query("metformin dosage guidance for adults", SearchType::KeywordOnly);
        q.min_score = 0.0;
        let response = h.engine.search(q).await.unwrap();

        assert_eq!(response.total_results, 1);
        // 0.6 base + 0.1 medium credibility
        assert!((response.results[0].confidence_score - 0.7).abs() < 1e-6);
        assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_conjunctive_filters_exclude_partial_matches() {
        let h = harness(vec![vector_match("doc1", "Guideline text", 0.9, &[])]);

        let mut q = query("guideline", SearchType::VectorOnly);
        q.filters = SearchFilters {
            document_types: Some(vec![DocumentType::MedicalGuideline]),
            credibility_levels: Some(vec![CredibilityLevel::High]),
            ..SearchFilters::default()
        };
        // Matches document type but the stub's credibility is Medium
        let response = h.engine.search(q).await.unwrap();
        assert_eq!(response.total_results, 0);
    }

    #[tokio::test]
    async fn test_cache_round_trip_skips_second_index_call() {
        let h = harness(vec![vector_match("doc1", "Cached content", 0.9, &[])]);

        let first = h
            .engine
            .search(query("diabetes", SearchType::VectorOnly))
            .await
            .unwrap();
        let second = h
            .engine
            .search(query("diabetes", SearchType::VectorOnly))
            .await
            .unwrap();

        assert_eq!(first.results, second.results);
        assert_eq!(h.vector_index.query_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_results_are_a_successful_response() {
        let h = harness(vec![]);
        let response = h
            .engine
            .search(query("anything", SearchType::VectorOnly))
            .await
            .unwrap();
        assert_eq!(response.total_results, 0);
        assert!(response.results.is_empty());
    }

    #[tokio::test]
    async fn test_max_results_truncation() {
        let matches: Vec<VectorMatch> = (0..20)
            .map(|i| {
                vector_match(
                    &format!("doc{}", i),
                    &format!("Result body {}", i),
                    0.9 - i as f32 * 0.001,
                    &[],
                )
            })
            .collect();
        let h = harness(matches);

        let mut q = query("anything", SearchType::VectorOnly);
        q.max_results = 5;
        let response = h.engine.search(q).await.unwrap();
        assert_eq!(response.total_results, 5);
    }
}
