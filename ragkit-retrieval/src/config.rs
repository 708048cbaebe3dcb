//! Configuration for retrieval and post-processing.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

/// Configuration parameters for the [`Retriever`](crate::retriever::Retriever).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrieverConfig {
    /// Number of top results to return.
    pub top_k: usize,
    /// Minimum semantic similarity for results (results below this are dropped).
    pub similarity_threshold: f32,
    /// Weight of the semantic score in hybrid fusion.
    pub semantic_weight: f32,
    /// Weight of the keyword score in hybrid fusion.
    pub keyword_weight: f32,
    /// Candidate over-fetch factor: each strategy fetches `top_k * candidate_multiplier`.
    pub candidate_multiplier: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            similarity_threshold: 0.7,
            semantic_weight: 0.7,
            keyword_weight: 0.3,
            candidate_multiplier: 2,
        }
    }
}

impl RetrieverConfig {
    /// Create a new builder for constructing a [`RetrieverConfig`].
    pub fn builder() -> RetrieverConfigBuilder {
        RetrieverConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RetrieverConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetrieverConfigBuilder {
    config: RetrieverConfig,
}

impl RetrieverConfigBuilder {
    /// Set the number of top results to return.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum semantic similarity threshold.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Set the hybrid fusion weights.
    ///
    /// The source defaults (0.7/0.3) are a starting point, not a tuned
    /// optimum; the weights are deliberately configurable.
    pub fn fusion_weights(mut self, semantic: f32, keyword: f32) -> Self {
        self.config.semantic_weight = semantic;
        self.config.keyword_weight = keyword;
        self
    }

    /// Set the candidate over-fetch factor.
    pub fn candidate_multiplier(mut self, multiplier: usize) -> Self {
        self.config.candidate_multiplier = multiplier;
        self
    }

    /// Build the [`RetrieverConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::ConfigError`] if:
    /// - `top_k == 0`
    /// - `similarity_threshold` is outside `[0, 1]`
    /// - either fusion weight is negative
    /// - `candidate_multiplier == 0`
    pub fn build(self) -> Result<RetrieverConfig> {
        if self.config.top_k == 0 {
            return Err(RetrievalError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if !(0.0..=1.0).contains(&self.config.similarity_threshold) {
            return Err(RetrievalError::ConfigError(format!(
                "similarity_threshold ({}) must be within [0, 1]",
                self.config.similarity_threshold
            )));
        }
        if self.config.semantic_weight < 0.0 || self.config.keyword_weight < 0.0 {
            return Err(RetrievalError::ConfigError(format!(
                "fusion weights ({}, {}) must be non-negative",
                self.config.semantic_weight, self.config.keyword_weight
            )));
        }
        if self.config.candidate_multiplier == 0 {
            return Err(RetrievalError::ConfigError(
                "candidate_multiplier must be greater than zero".to_string(),
            ));
        }
        Ok(self.config)
    }
}

/// Weights of the composite rerank score in
/// [`QueryPostProcessor`](crate::postprocess::QueryPostProcessor).
///
/// `composite = original * score + overlap * (query overlap) + position * 1.0
/// + length * length_score`. The position component is the constant the
/// source carried; its weight stays configurable so a real positional score
/// can slot in later.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RerankWeights {
    /// Weight of the incoming relevance score.
    pub original: f32,
    /// Weight of query-word overlap.
    pub overlap: f32,
    /// Weight of the position component.
    pub position: f32,
    /// Weight of the length component.
    pub length: f32,
}

impl Default for RerankWeights {
    fn default() -> Self {
        Self { original: 0.5, overlap: 0.3, position: 0.1, length: 0.1 }
    }
}

/// Configuration parameters for the
/// [`QueryPostProcessor`](crate::postprocess::QueryPostProcessor).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostProcessConfig {
    /// Whether composite reranking is applied.
    pub rerank_enabled: bool,
    /// Whether chunk-list compression is applied.
    pub compression_enabled: bool,
    /// Compression floor: the final list never drops below this many chunks
    /// (unless fewer were retrieved), and compression only triggers above it.
    pub max_chunks: usize,
    /// Fraction of chunks kept when compressing.
    pub compression_ratio: f32,
    /// Composite rerank score weights.
    pub rerank_weights: RerankWeights,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            rerank_enabled: true,
            compression_enabled: true,
            max_chunks: 10,
            compression_ratio: 0.7,
            rerank_weights: RerankWeights::default(),
        }
    }
}

impl PostProcessConfig {
    /// Create a new builder for constructing a [`PostProcessConfig`].
    pub fn builder() -> PostProcessConfigBuilder {
        PostProcessConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`PostProcessConfig`].
#[derive(Debug, Clone, Default)]
pub struct PostProcessConfigBuilder {
    config: PostProcessConfig,
}

impl PostProcessConfigBuilder {
    /// Enable or disable composite reranking.
    pub fn rerank_enabled(mut self, enabled: bool) -> Self {
        self.config.rerank_enabled = enabled;
        self
    }

    /// Enable or disable chunk-list compression.
    pub fn compression_enabled(mut self, enabled: bool) -> Self {
        self.config.compression_enabled = enabled;
        self
    }

    /// Set the compression floor.
    pub fn max_chunks(mut self, max: usize) -> Self {
        self.config.max_chunks = max;
        self
    }

    /// Set the fraction of chunks kept when compressing.
    pub fn compression_ratio(mut self, ratio: f32) -> Self {
        self.config.compression_ratio = ratio;
        self
    }

    /// Set the composite rerank weights.
    pub fn rerank_weights(mut self, weights: RerankWeights) -> Self {
        self.config.rerank_weights = weights;
        self
    }

    /// Build the [`PostProcessConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::ConfigError`] if:
    /// - `max_chunks == 0`
    /// - `compression_ratio` is outside `(0, 1]`
    /// - any rerank weight is negative
    pub fn build(self) -> Result<PostProcessConfig> {
        if self.config.max_chunks == 0 {
            return Err(RetrievalError::ConfigError(
                "max_chunks must be greater than zero".to_string(),
            ));
        }
        if !(self.config.compression_ratio > 0.0 && self.config.compression_ratio <= 1.0) {
            return Err(RetrievalError::ConfigError(format!(
                "compression_ratio ({}) must be within (0, 1]",
                self.config.compression_ratio
            )));
        }
        let w = self.config.rerank_weights;
        if w.original < 0.0 || w.overlap < 0.0 || w.position < 0.0 || w.length < 0.0 {
            return Err(RetrievalError::ConfigError(
                "rerank weights must be non-negative".to_string(),
            ));
        }
        Ok(self.config)
    }
}
