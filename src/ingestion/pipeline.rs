//! # Ingestion Pipeline
//!
//! ## Purpose
//! Orchestrates the complete ingestion workflow: validation, segmentation,
//! concurrent embedding, batched vector upsert and keyword index rebuild.
//!
//! ## Input/Output Specification
//! - **Input**: Document batches, delete and metadata-patch requests
//! - **Output**: Reports with counts, bounded error lists and timings
//! - **Workflow**: Validate -> Segment -> Embed -> Upsert -> Reindex
//!
//! ## Key Features
//! - Fixed-size batches with a cooperative pause between them
//! - Semaphore-bounded concurrent embedding within a batch
//! - All successfully embedded chunks upserted in one request per batch
//! - Per-document error isolation; sibling documents always continue
//! - Full replace on re-ingestion of an existing source

use crate::cache::ResultCache;
use crate::config::IngestionConfig;
use crate::embedding::EmbeddingProvider;
use crate::filter::SearchFilters;
use crate::ingestion::{DocumentValidator, IngestionReport, MetadataPatch, OperationReport};
use crate::keyword::KeywordIndex;
use crate::segmenter::TextSegmenter;
use crate::utils::Timer;
use crate::vector_index::{VectorIndex, VectorRecord, VectorRecordMetadata};
use crate::{Chunk, Document};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, Semaphore};
use tokio::time::sleep;
use uuid::Uuid;

/// Main ingestion pipeline
pub struct IngestionPipeline {
    config: IngestionConfig,
    validator: DocumentValidator,
    segmenter: Arc<TextSegmenter>,
    embedder: Arc<dyn EmbeddingProvider>,
    vector_index: Arc<dyn VectorIndex>,
    keyword_index: Arc<KeywordIndex>,
    cache: Arc<ResultCache>,
    /// Chunk corpus by source, mirrored into the keyword index
    corpus: RwLock<HashMap<String, Vec<Arc<Chunk>>>>,
    embed_semaphore: Arc<Semaphore>,
}

/// Per-document outcome inside one batch
struct DocumentOutcome {
    source: String,
    chunks: Vec<(Arc<Chunk>, Vec<f32>)>,
    errors: Vec<String>,
}

impl IngestionPipeline {
    pub fn new(
        config: IngestionConfig,
        embed_concurrency: usize,
        segmenter: Arc<TextSegmenter>,
        embedder: Arc<dyn EmbeddingProvider>,
        vector_index: Arc<dyn VectorIndex>,
        keyword_index: Arc<KeywordIndex>,
        cache: Arc<ResultCache>,
    ) -> Self {
        Self {
            config,
            validator: DocumentValidator::new(),
            segmenter,
            embedder,
            vector_index,
            keyword_index,
            cache,
            corpus: RwLock::new(HashMap::new()),
            embed_semaphore: Arc::new(Semaphore::new(embed_concurrency.max(1))),
        }
    }

    /// Ingest a set of documents in fixed-size batches.
    ///
    /// Individual document failures are collected into the report and never
    /// abort sibling documents. Returns counts plus a bounded error list.
    pub async fn add_documents(&self, documents: Vec<Document>) -> IngestionReport {
        let timer = Timer::new("add_documents");
        let run_id = Uuid::new_v4();
        let total_documents = documents.len();
        tracing::info!(%run_id, total_documents, "starting ingestion run");

        let mut successful_uploads = 0;
        let mut errors: Vec<String> = Vec::new();

        let total_batches = total_documents.div_ceil(self.config.batch_size.max(1));
        for (batch_id, batch) in documents.chunks(self.config.batch_size.max(1)).enumerate() {
            let outcomes = self.process_batch(batch).await;

            for outcome in outcomes {
                if outcome.errors.is_empty() {
                    successful_uploads += 1;
                } else {
                    for error in outcome.errors {
                        errors.push(format!("{}: {}", outcome.source, error));
                    }
                }
            }

            tracing::debug!(%run_id, batch_id, total_batches, "batch completed");

            // Cooperative pause between batches for collaborator rate limits
            if batch_id + 1 < total_batches && self.config.rate_limit_delay_ms > 0 {
                sleep(Duration::from_millis(self.config.rate_limit_delay_ms)).await;
            }
        }

        self.rebuild_keyword_index().await;
        self.cache.clear();

        let failed_uploads = total_documents - successful_uploads;
        errors.truncate(self.config.max_reported_errors);

        let report = IngestionReport {
            total_documents,
            successful_uploads,
            failed_uploads,
            errors,
            processing_time_seconds: timer.elapsed_seconds(),
        };
        tracing::info!(
            %run_id,
            successful = report.successful_uploads,
            failed = report.failed_uploads,
            elapsed_seconds = report.processing_time_seconds,
            "ingestion run completed"
        );
        report
    }

    /// Remove every indexed chunk belonging to a source
    pub async fn delete_by_source(&self, source: &str) -> OperationReport {
        let timer = Timer::new("delete_by_source");

        let predicate = match SearchFilters::for_source(source).to_index_predicate() {
            Some(predicate) => predicate,
            None => {
                return OperationReport {
                    success: false,
                    message: "Source must not be empty".to_string(),
                    operation_time_seconds: timer.elapsed_seconds(),
                }
            }
        };

        match self.vector_index.delete_by_filter(predicate).await {
            Ok(()) => {
                let removed = self.corpus.write().await.remove(source).is_some();
                self.rebuild_keyword_index().await;
                self.cache.clear();
                OperationReport {
                    success: true,
                    message: if removed {
                        format!("Deleted all chunks for source '{}'", source)
                    } else {
                        format!("No local chunks for source '{}', index cleared", source)
                    },
                    operation_time_seconds: timer.elapsed_seconds(),
                }
            }
            Err(e) => {
                tracing::error!(source, error = %e, "delete by source failed");
                OperationReport {
                    success: false,
                    message: e.to_string(),
                    operation_time_seconds: timer.elapsed_seconds(),
                }
            }
        }
    }

    /// Patch document metadata across all chunks of a source
    pub async fn update_metadata(&self, source: &str, patch: MetadataPatch) -> OperationReport {
        let timer = Timer::new("update_metadata");

        if patch.is_empty() {
            return OperationReport {
                success: false,
                message: "No metadata fields provided".to_string(),
                operation_time_seconds: timer.elapsed_seconds(),
            };
        }

        let predicate = match SearchFilters::for_source(source).to_index_predicate() {
            Some(predicate) => predicate,
            None => {
                return OperationReport {
                    success: false,
                    message: "Source must not be empty".to_string(),
                    operation_time_seconds: timer.elapsed_seconds(),
                }
            }
        };

        let updates = match serde_json::to_value(&patch) {
            Ok(updates) => updates,
            Err(e) => {
                return OperationReport {
                    success: false,
                    message: e.to_string(),
                    operation_time_seconds: timer.elapsed_seconds(),
                }
            }
        };

        match self.vector_index.patch_metadata(predicate, updates).await {
            Ok(()) => {
                let patched = self.apply_patch_locally(source, &patch).await;
                self.rebuild_keyword_index().await;
                self.cache.clear();
                OperationReport {
                    success: true,
                    message: format!("Updated metadata on {} chunks for source '{}'", patched, source),
                    operation_time_seconds: timer.elapsed_seconds(),
                }
            }
            Err(e) => {
                tracing::error!(source, error = %e, "metadata update failed");
                OperationReport {
                    success: false,
                    message: e.to_string(),
                    operation_time_seconds: timer.elapsed_seconds(),
                }
            }
        }
    }

    /// Number of chunks currently held in the local corpus
    pub async fn chunk_count(&self) -> usize {
        self.corpus.read().await.values().map(Vec::len).sum()
    }

    /// Process one batch: validate, segment, embed concurrently, then upsert
    /// all successfully embedded vectors in a single request.
    async fn process_batch(&self, documents: &[Document]) -> Vec<DocumentOutcome> {
        let mut outcomes: Vec<DocumentOutcome> = Vec::with_capacity(documents.len());
        let mut chunk_jobs: Vec<(usize, Arc<Chunk>)> = Vec::new();

        for document in documents {
            let mut outcome = DocumentOutcome {
                source: document.source.clone(),
                chunks: Vec::new(),
                errors: Vec::new(),
            };

            if let Err(e) = self.validator.validate(document) {
                outcome.errors.push(e.to_string());
                outcomes.push(outcome);
                continue;
            }

            // Full replace: supersede any previously indexed chunks
            if let Err(e) = self.supersede_source(&document.source).await {
                outcome.errors.push(e.to_string());
                outcomes.push(outcome);
                continue;
            }

            let doc_idx = outcomes.len();
            for chunk in self.segmenter.segment(document) {
                chunk_jobs.push((doc_idx, Arc::new(chunk)));
            }
            outcomes.push(outcome);
        }

        // Embed chunks concurrently under the worker-pool bound
        let embed_futures = chunk_jobs.into_iter().map(|(doc_idx, chunk)| {
            let embedder = self.embedder.clone();
            let semaphore = self.embed_semaphore.clone();
            async move {
                let _permit = semaphore.acquire_owned().await.unwrap();
                let result = embedder.embed(&chunk.text).await;
                (doc_idx, chunk, result)
            }
        });

        for (doc_idx, chunk, result) in join_all(embed_futures).await {
            match result {
                Ok(vector) => outcomes[doc_idx].chunks.push((chunk, vector)),
                Err(e) => outcomes[doc_idx].errors.push(e.to_string()),
            }
        }

        // One upsert per batch covering every successfully embedded chunk
        let records: Vec<VectorRecord> = outcomes
            .iter()
            .flat_map(|outcome| {
                outcome.chunks.iter().map(|(chunk, vector)| VectorRecord {
                    id: chunk.chunk_id.clone(),
                    vector: vector.clone(),
                    metadata: VectorRecordMetadata::from(chunk.as_ref()),
                })
            })
            .collect();

        if !records.is_empty() {
            if let Err(e) = self.vector_index.upsert(records).await {
                tracing::error!(error = %e, "batch upsert failed");
                for outcome in &mut outcomes {
                    if !outcome.chunks.is_empty() {
                        outcome.errors.push(format!("upsert failed: {}", e));
                        outcome.chunks.clear();
                    }
                }
            }
        }

        // Record surviving chunks in the local corpus
        let mut corpus = self.corpus.write().await;
        for outcome in &outcomes {
            if !outcome.chunks.is_empty() {
                corpus.insert(
                    outcome.source.clone(),
                    outcome.chunks.iter().map(|(chunk, _)| chunk.clone()).collect(),
                );
            }
        }

        outcomes
    }

    /// Delete prior vectors and local chunks for a source being re-ingested
    async fn supersede_source(&self, source: &str) -> crate::errors::Result<()> {
        if let Some(predicate) = SearchFilters::for_source(source).to_index_predicate() {
            self.vector_index.delete_by_filter(predicate).await?;
        }
        self.corpus.write().await.remove(source);
        Ok(())
    }

    async fn apply_patch_locally(&self, source: &str, patch: &MetadataPatch) -> usize {
        let mut corpus = self.corpus.write().await;
        let Some(chunks) = corpus.get_mut(source) else {
            return 0;
        };

        for chunk in chunks.iter_mut() {
            let mut updated = chunk.as_ref().clone();
            if let Some(title) = &patch.title {
                updated.metadata.title = title.clone();
            }
            if let Some(document_type) = patch.document_type {
                updated.metadata.document_type = document_type;
            }
            if let Some(credibility) = patch.credibility_level {
                updated.metadata.credibility_level = credibility;
            }
            if let Some(last_updated) = patch.last_updated {
                updated.metadata.last_updated = last_updated;
            }
            *chunk = Arc::new(updated);
        }
        chunks.len()
    }

    /// Rebuild-and-swap the keyword index from the current corpus
    async fn rebuild_keyword_index(&self) {
        let chunks: Vec<Arc<Chunk>> = {
            let corpus = self.corpus.read().await;
            corpus.values().flatten().cloned().collect()
        };
        self.keyword_index.rebuild(&chunks);
    }
}
