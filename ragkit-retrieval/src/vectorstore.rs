//! Vector store trait for similarity and keyword search.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::document::ScoredChunk;
use crate::error::Result;

/// A search backend over ingested document chunks.
///
/// Implementations wrap a vector index (and, for [`keyword_search`], any
/// lexical index whose scores are comparable in range to semantic scores).
/// An empty backing index returns an empty result set, never an error.
///
/// # Example
///
/// ```rust,ignore
/// use ragkit_retrieval::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.upsert(&chunks).await?;
/// let results = store.search_by_text("query", 5, None).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Search for the `top_k` chunks most similar to the query text.
    ///
    /// Returns `(chunk, score)` pairs ordered by descending similarity,
    /// restricted to `document_ids` when given.
    async fn search_by_text(
        &self,
        query: &str,
        top_k: usize,
        document_ids: Option<&HashSet<String>>,
    ) -> Result<Vec<ScoredChunk>>;

    /// Search for the `top_k` chunks most similar to the given embedding.
    async fn search_by_vector(
        &self,
        embedding: &[f32],
        top_k: usize,
        document_ids: Option<&HashSet<String>>,
    ) -> Result<Vec<ScoredChunk>>;

    /// Lexical/keyword search over the `top_k` best-matching chunks.
    ///
    /// Scores must be comparable in range to [`search_by_text`] scores so
    /// hybrid fusion can combine them.
    ///
    /// [`search_by_text`]: VectorStore::search_by_text
    async fn keyword_search(
        &self,
        query: &str,
        top_k: usize,
        document_ids: Option<&HashSet<String>>,
    ) -> Result<Vec<ScoredChunk>>;
}
