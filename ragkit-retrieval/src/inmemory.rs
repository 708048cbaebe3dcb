//! In-memory vector store using cosine similarity and lexical scoring.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency store
//! backed by a `HashMap` protected by a `tokio::sync::RwLock`. It implements
//! both [`VectorStore`] and [`DocumentRepository`] and is suitable for
//! development, testing, and small-scale use cases.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{DocumentChunk, ScoredChunk};
use crate::error::Result;
use crate::repository::DocumentRepository;
use crate::vectorstore::VectorStore;

/// An in-memory store scoring by cosine similarity (vector search) and
/// token overlap / term frequency (text and keyword search).
///
/// All scores are in `[0, 1]`. Searching an empty store returns an empty
/// result set.
///
/// # Example
///
/// ```rust,ignore
/// use ragkit_retrieval::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.upsert(&chunks).await;
/// let hits = store.search_by_text("rust ownership", 5, None).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    chunks: RwLock<HashMap<String, DocumentChunk>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace chunks by ID.
    pub async fn upsert(&self, chunks: &[DocumentChunk]) {
        let mut store = self.chunks.write().await;
        for chunk in chunks {
            store.insert(chunk.id.clone(), chunk.clone());
        }
    }

    /// Remove chunks by ID. Unknown IDs are ignored.
    pub async fn delete(&self, ids: &[&str]) {
        let mut store = self.chunks.write().await;
        for id in ids {
            store.remove(*id);
        }
    }

    /// Number of stored chunks.
    pub async fn len(&self) -> usize {
        self.chunks.read().await.len()
    }

    /// Whether the store holds no chunks.
    pub async fn is_empty(&self) -> bool {
        self.chunks.read().await.is_empty()
    }

    async fn score_chunks<F>(
        &self,
        top_k: usize,
        document_ids: Option<&HashSet<String>>,
        score: F,
    ) -> Vec<ScoredChunk>
    where
        F: Fn(&DocumentChunk) -> f32,
    {
        let store = self.chunks.read().await;
        let mut scored: Vec<ScoredChunk> = store
            .values()
            .filter(|chunk| document_ids.is_none_or(|ids| ids.contains(&chunk.document_id)))
            .map(|chunk| ScoredChunk { chunk: chunk.clone(), score: score(chunk) })
            .filter(|sc| sc.score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Fraction of unique query tokens present in the text, in `[0, 1]`.
fn token_overlap(query_tokens: &HashSet<String>, text: &str) -> f32 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let text_tokens: HashSet<String> = tokenize(text).into_iter().collect();
    let hits = query_tokens.iter().filter(|t| text_tokens.contains(*t)).count();
    hits as f32 / query_tokens.len() as f32
}

/// Term-frequency score: per query term, occurrences relative to chunk
/// length, averaged over query terms and squashed into `[0, 1]`.
fn tf_score(query_tokens: &[String], text: &str) -> f32 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let text_tokens = tokenize(text);
    if text_tokens.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in &text_tokens {
        *counts.entry(token.as_str()).or_default() += 1;
    }
    let total: f32 = query_tokens
        .iter()
        .map(|term| {
            let tf = counts.get(term.as_str()).copied().unwrap_or(0) as f32
                / text_tokens.len() as f32;
            // Squash so that a single occurrence in a short chunk does not
            // saturate the score.
            (tf * 10.0).min(1.0)
        })
        .sum();
    total / query_tokens.len() as f32
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn search_by_text(
        &self,
        query: &str,
        top_k: usize,
        document_ids: Option<&HashSet<String>>,
    ) -> Result<Vec<ScoredChunk>> {
        let query_tokens: HashSet<String> = tokenize(query).into_iter().collect();
        Ok(self
            .score_chunks(top_k, document_ids, |chunk| token_overlap(&query_tokens, &chunk.content))
            .await)
    }

    async fn search_by_vector(
        &self,
        embedding: &[f32],
        top_k: usize,
        document_ids: Option<&HashSet<String>>,
    ) -> Result<Vec<ScoredChunk>> {
        Ok(self
            .score_chunks(top_k, document_ids, |chunk| {
                chunk.embedding.as_deref().map(|e| cosine_similarity(e, embedding)).unwrap_or(0.0)
            })
            .await)
    }

    async fn keyword_search(
        &self,
        query: &str,
        top_k: usize,
        document_ids: Option<&HashSet<String>>,
    ) -> Result<Vec<ScoredChunk>> {
        let query_tokens = tokenize(query);
        Ok(self
            .score_chunks(top_k, document_ids, |chunk| tf_score(&query_tokens, &chunk.content))
            .await)
    }
}

#[async_trait]
impl DocumentRepository for InMemoryVectorStore {
    async fn get_chunks_by_document(&self, document_id: &str) -> Result<Vec<DocumentChunk>> {
        let store = self.chunks.read().await;
        let mut chunks: Vec<DocumentChunk> =
            store.values().filter(|c| c.document_id == document_id).cloned().collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }
}
