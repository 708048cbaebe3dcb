//! Data types for document chunks, scored results, and query output.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::query::RetrievalStrategy;

/// A bounded span of a source document's text, the atomic unit of retrieval.
///
/// Chunks are created during document ingestion (outside this crate) and are
/// read-only from the retrieval core's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The ID of the parent document.
    pub document_id: String,
    /// The text content of the chunk.
    pub content: String,
    /// Position of this chunk within the source document.
    pub chunk_index: usize,
    /// Optional fixed-length embedding vector for this chunk's text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Key-value metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: HashMap<String, String>,
}

impl DocumentChunk {
    /// Create a chunk with the given identity and content and empty metadata.
    pub fn new(
        id: impl Into<String>,
        document_id: impl Into<String>,
        content: impl Into<String>,
        chunk_index: usize,
    ) -> Self {
        Self {
            id: id.into(),
            document_id: document_id.into(),
            content: content.into(),
            chunk_index,
            embedding: None,
            metadata: HashMap::new(),
        }
    }

    /// Attach an embedding vector to this chunk.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Insert a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A retrieved [`DocumentChunk`] paired with a relevance score.
///
/// Scores are nominally in `[0, 1]` but may exceed 1.0 after hybrid fusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// The retrieved chunk.
    pub chunk: DocumentChunk,
    /// The relevance score (higher is more relevant).
    pub score: f32,
}

/// The outcome of a [`Retriever::retrieve`](crate::retriever::Retriever::retrieve) call.
///
/// A retrieval failure never propagates as an error; it yields an empty chunk
/// list with [`error`](QueryResult::error) populated, so callers can treat it
/// as "no relevant information found".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Retrieved chunks ordered by descending relevance.
    pub chunks: Vec<ScoredChunk>,
    /// Number of candidates found before truncation and post-processing.
    pub total_found: usize,
    /// Wall-clock time spent in retrieval, in milliseconds.
    pub query_time_ms: u64,
    /// The strategy that produced these results.
    pub strategy: RetrievalStrategy,
    /// Free-form result metadata (query type, compression stats, ...).
    pub metadata: HashMap<String, String>,
    /// Set when retrieval failed; `chunks` is empty in that case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    /// Build an empty result carrying an error description.
    pub fn failed(strategy: RetrievalStrategy, query_time_ms: u64, error: impl Into<String>) -> Self {
        Self {
            chunks: Vec::new(),
            total_found: 0,
            query_time_ms,
            strategy,
            metadata: HashMap::new(),
            error: Some(error.into()),
        }
    }
}
