//! Multi-strategy retrieval orchestration.
//!
//! The [`Retriever`] coordinates the full query workflow by composing a
//! [`QueryPreProcessor`], a [`VectorStore`], a [`DocumentRepository`], and a
//! [`QueryPostProcessor`]. Its [`retrieve`](Retriever::retrieve) entry point
//! never returns an error: collaborator failures degrade to an empty
//! [`QueryResult`] with the error text attached.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragkit_retrieval::{Retriever, RetrieverConfig, InMemoryVectorStore, RetrieveOptions};
//!
//! let store = Arc::new(InMemoryVectorStore::new());
//! let retriever = Retriever::builder()
//!     .config(RetrieverConfig::default())
//!     .vector_store(store.clone())
//!     .repository(store)
//!     .build()?;
//!
//! let result = retriever.retrieve("what is rust ownership", RetrieveOptions::default()).await;
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use crate::config::RetrieverConfig;
use crate::document::{DocumentChunk, QueryResult, ScoredChunk};
use crate::error::{Result, RetrievalError};
use crate::filter::SearchFilter;
use crate::postprocess::QueryPostProcessor;
use crate::query::{ProcessedQuery, QueryPreProcessor, RetrievalStrategy};
use crate::repository::DocumentRepository;
use crate::vectorstore::VectorStore;

/// Weight of the store's similarity score in the semantic-path candidate
/// rerank that runs when more than `top_k` candidates survive the threshold.
const SEMANTIC_RERANK_SCORE_WEIGHT: f32 = 0.7;
/// Weight of query-word overlap in the semantic-path candidate rerank.
const SEMANTIC_RERANK_OVERLAP_WEIGHT: f32 = 0.3;

/// Per-call options for [`Retriever::retrieve`].
///
/// Every field is optional; unset fields fall back to the retriever's
/// configuration and the pre-processor's strategy recommendation.
#[derive(Debug, Clone, Default)]
pub struct RetrieveOptions {
    /// Override the configured number of results.
    pub top_k: Option<usize>,
    /// Constraints narrowing the search.
    pub filter: Option<SearchFilter>,
    /// Force a strategy instead of the pre-processor's recommendation.
    pub strategy: Option<RetrievalStrategy>,
}

impl RetrieveOptions {
    /// Override the number of results for this call.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Attach a search filter to this call.
    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Force a retrieval strategy for this call.
    pub fn with_strategy(mut self, strategy: RetrievalStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// The retrieval orchestrator.
///
/// Dispatches each query to one of the semantic, keyword, or hybrid search
/// paths and post-processes the winners uniformly. Construct one via
/// [`Retriever::builder()`].
pub struct Retriever {
    config: RetrieverConfig,
    vector_store: Arc<dyn VectorStore>,
    repository: Arc<dyn DocumentRepository>,
    preprocessor: QueryPreProcessor,
    postprocessor: QueryPostProcessor,
}

impl Retriever {
    /// Create a new [`RetrieverBuilder`].
    pub fn builder() -> RetrieverBuilder {
        RetrieverBuilder::default()
    }

    /// Return a reference to the retriever configuration.
    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Return a reference to the document repository.
    pub fn repository(&self) -> &Arc<dyn DocumentRepository> {
        &self.repository
    }

    /// Run a query end to end: pre-process → strategy dispatch → filter →
    /// post-process.
    ///
    /// The caller-supplied strategy in `options` wins over the
    /// pre-processor's recommendation. Collaborator errors are logged and
    /// folded into the result's [`error`](QueryResult::error) field, so this
    /// method is infallible from the caller's perspective.
    pub async fn retrieve(&self, query: &str, options: RetrieveOptions) -> QueryResult {
        let started = Instant::now();

        let processed = self.preprocessor.process(query);
        let strategy = options.strategy.unwrap_or(processed.strategy);
        let top_k = options.top_k.unwrap_or(self.config.top_k);
        let filter = options.filter.as_ref();
        let document_ids = filter.and_then(|f| f.document_ids.as_ref());

        let outcome = match strategy {
            RetrievalStrategy::Semantic => {
                self.semantic_search(&processed, top_k, document_ids).await
            }
            RetrievalStrategy::Keyword => {
                self.keyword_search(&processed, top_k, document_ids).await
            }
            RetrievalStrategy::Hybrid => self.hybrid_search(&processed, top_k, document_ids).await,
        };

        let (total_found, candidates) = match outcome {
            Ok(found) => found,
            Err(e) => {
                let query_time_ms = started.elapsed().as_millis() as u64;
                error!(strategy = strategy.as_str(), error = %e, "retrieval failed");
                return QueryResult::failed(strategy, query_time_ms, e.to_string());
            }
        };

        let candidates = match filter {
            Some(f) if f.has_local_constraints() => {
                candidates.into_iter().filter(|sc| f.matches(&sc.chunk)).collect()
            }
            _ => candidates,
        };

        let post = self.postprocessor.process(&processed.processed_query, candidates);

        let mut metadata = processed.metadata.clone();
        metadata.insert("query_type".to_string(), processed.query_type.as_str().to_string());
        metadata.insert("strategy".to_string(), strategy.as_str().to_string());
        metadata.insert("reranked".to_string(), post.reranked.to_string());
        metadata.insert("compressed".to_string(), post.compressed.to_string());
        metadata.insert("total_compressed".to_string(), post.total_compressed.to_string());

        let query_time_ms = started.elapsed().as_millis() as u64;
        info!(
            strategy = strategy.as_str(),
            result_count = post.chunks.len(),
            total_found,
            query_time_ms,
            "retrieval completed"
        );

        QueryResult {
            chunks: post.chunks,
            total_found,
            query_time_ms,
            strategy,
            metadata,
            error: None,
        }
    }

    /// Fetch the full ordered chunk list of a document from the repository.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::RetrievalFailed`] if the repository lookup
    /// fails.
    pub async fn document_chunks(&self, document_id: &str) -> Result<Vec<DocumentChunk>> {
        self.repository.get_chunks_by_document(document_id).await.map_err(|e| {
            error!(document_id, error = %e, "document chunk lookup failed");
            RetrievalError::RetrievalFailed(format!(
                "chunk lookup failed for document '{document_id}': {e}"
            ))
        })
    }

    /// Embedding-similarity search with threshold filtering and a lexical
    /// tiebreak rerank.
    ///
    /// Returns `(candidates surviving the threshold, final top_k list)`.
    async fn semantic_search(
        &self,
        processed: &ProcessedQuery,
        top_k: usize,
        document_ids: Option<&HashSet<String>>,
    ) -> Result<(usize, Vec<ScoredChunk>)> {
        let fetch = top_k * self.config.candidate_multiplier;
        let query = enhanced_query(processed);
        let hits = self.vector_store.search_by_text(&query, fetch, document_ids).await?;

        let mut hits: Vec<ScoredChunk> =
            hits.into_iter().filter(|sc| sc.score >= self.config.similarity_threshold).collect();
        let total_found = hits.len();

        if hits.len() > top_k {
            let query_words: HashSet<String> = processed
                .processed_query
                .split_whitespace()
                .map(|w| w.to_lowercase())
                .collect();
            for hit in &mut hits {
                let overlap = lexical_overlap(&query_words, &hit.chunk.content);
                hit.score = SEMANTIC_RERANK_SCORE_WEIGHT * hit.score
                    + SEMANTIC_RERANK_OVERLAP_WEIGHT * overlap;
            }
            sort_by_score_desc(&mut hits);
        }

        hits.truncate(top_k);
        Ok((total_found, hits))
    }

    /// Lexical search delegated to the store's keyword entry point.
    async fn keyword_search(
        &self,
        processed: &ProcessedQuery,
        top_k: usize,
        document_ids: Option<&HashSet<String>>,
    ) -> Result<(usize, Vec<ScoredChunk>)> {
        let fetch = top_k * self.config.candidate_multiplier;
        let mut hits = self
            .vector_store
            .keyword_search(&processed.processed_query, fetch, document_ids)
            .await?;

        let total_found = hits.len();
        hits.truncate(top_k);
        Ok((total_found, hits))
    }

    /// Concurrent semantic + keyword search fused by weighted score merge.
    ///
    /// Chunks found by only one side keep 0.0 for the missing side, so a
    /// chunk found by both always outranks an equal single-side hit.
    async fn hybrid_search(
        &self,
        processed: &ProcessedQuery,
        top_k: usize,
        document_ids: Option<&HashSet<String>>,
    ) -> Result<(usize, Vec<ScoredChunk>)> {
        let fetch = top_k * self.config.candidate_multiplier;
        let query = enhanced_query(processed);
        let (semantic, keyword) = futures::join!(
            self.vector_store.search_by_text(&query, fetch, document_ids),
            self.vector_store.keyword_search(&processed.processed_query, fetch, document_ids),
        );
        let (semantic, keyword) = (semantic?, keyword?);

        let mut by_id: HashMap<String, (DocumentChunk, f32, f32)> = HashMap::new();
        for hit in semantic {
            let entry = by_id.entry(hit.chunk.id.clone()).or_insert((hit.chunk, 0.0, 0.0));
            entry.1 = hit.score;
        }
        for hit in keyword {
            let entry = by_id.entry(hit.chunk.id.clone()).or_insert((hit.chunk, 0.0, 0.0));
            entry.2 = hit.score;
        }

        let mut fused: Vec<ScoredChunk> = by_id
            .into_values()
            .map(|(chunk, semantic_score, keyword_score)| ScoredChunk {
                chunk,
                score: self.config.semantic_weight * semantic_score
                    + self.config.keyword_weight * keyword_score,
            })
            .collect();
        sort_by_score_desc(&mut fused);

        let total_found = fused.len();
        fused.truncate(top_k);
        Ok((total_found, fused))
    }
}

fn sort_by_score_desc(chunks: &mut [ScoredChunk]) {
    chunks.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
}

/// The query text fed to the semantic side: the cleaned query plus any
/// synonym expansions, space-joined.
fn enhanced_query(processed: &ProcessedQuery) -> String {
    if processed.expanded_terms.is_empty() {
        return processed.processed_query.clone();
    }
    let mut query = processed.processed_query.clone();
    for term in &processed.expanded_terms {
        query.push(' ');
        query.push_str(term);
    }
    query
}

/// Fraction of query words present in the content, in `[0, 1]`.
fn lexical_overlap(query_words: &HashSet<String>, content: &str) -> f32 {
    if query_words.is_empty() {
        return 0.0;
    }
    let content_words: HashSet<String> =
        content.split_whitespace().map(|w| w.to_lowercase()).collect();
    let hits = query_words.iter().filter(|w| content_words.contains(*w)).count();
    hits as f32 / query_words.len() as f32
}

/// Builder for constructing a [`Retriever`].
///
/// `config`, `vector_store`, and `repository` are required; the pre- and
/// post-processors default to their standard configurations.
#[derive(Default)]
pub struct RetrieverBuilder {
    config: Option<RetrieverConfig>,
    vector_store: Option<Arc<dyn VectorStore>>,
    repository: Option<Arc<dyn DocumentRepository>>,
    preprocessor: Option<QueryPreProcessor>,
    postprocessor: Option<QueryPostProcessor>,
}

impl RetrieverBuilder {
    /// Set the retriever configuration.
    pub fn config(mut self, config: RetrieverConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document repository.
    pub fn repository(mut self, repository: Arc<dyn DocumentRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Replace the default query pre-processor.
    pub fn preprocessor(mut self, preprocessor: QueryPreProcessor) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    /// Replace the default query post-processor.
    pub fn postprocessor(mut self, postprocessor: QueryPostProcessor) -> Self {
        self.postprocessor = Some(postprocessor);
        self
    }

    /// Build the [`Retriever`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::ConfigError`] if any required field is
    /// missing.
    pub fn build(self) -> Result<Retriever> {
        let config = self
            .config
            .ok_or_else(|| RetrievalError::ConfigError("config is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RetrievalError::ConfigError("vector_store is required".to_string()))?;
        let repository = self
            .repository
            .ok_or_else(|| RetrievalError::ConfigError("repository is required".to_string()))?;

        Ok(Retriever {
            config,
            vector_store,
            repository,
            preprocessor: self.preprocessor.unwrap_or_default(),
            postprocessor: self.postprocessor.unwrap_or_default(),
        })
    }
}
