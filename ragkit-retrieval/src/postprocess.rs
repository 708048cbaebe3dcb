//! Post-processing of scored chunk lists: reranking, deduplication,
//! compression, and context statistics.
//!
//! Every step is a pure function of the input list; nothing here suspends or
//! performs I/O.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::PostProcessConfig;
use crate::document::ScoredChunk;

/// Dedup key length: the first 100 characters of trimmed chunk content.
const DEDUP_PREFIX_CHARS: usize = 100;

/// Reference length for the rerank length score.
const TARGET_CHUNK_LEN: f32 = 200.0;

/// Per-document aggregate over the final chunk list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentContext {
    /// Number of chunks retrieved from this document.
    pub chunk_count: usize,
    /// Mean score of this document's chunks.
    pub avg_score: f32,
    /// IDs of this document's chunks, in final order.
    pub chunk_ids: Vec<String>,
}

/// Global score statistics over the final chunk list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreStats {
    pub min: f32,
    pub max: f32,
    pub avg: f32,
    pub count: usize,
}

/// Aggregate context built from the final chunk list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextInfo {
    /// Per-document distribution, keyed by document ID.
    pub documents: HashMap<String, DocumentContext>,
    /// Global score statistics.
    pub scores: ScoreStats,
}

/// The output of [`QueryPostProcessor::process`].
#[derive(Debug, Clone)]
pub struct PostProcessed {
    /// The final chunk list, ordered by descending score.
    pub chunks: Vec<ScoredChunk>,
    /// Aggregate context statistics.
    pub context: ContextInfo,
    /// Number of chunks removed by deduplication and compression.
    pub total_compressed: usize,
    /// Whether reranking ran.
    pub reranked: bool,
    /// Whether compression ran.
    pub compressed: bool,
}

/// Reranks, deduplicates, and compresses scored chunk lists.
#[derive(Debug, Clone, Default)]
pub struct QueryPostProcessor {
    config: PostProcessConfig,
}

impl QueryPostProcessor {
    /// Create a post-processor with the given configuration.
    pub fn new(config: PostProcessConfig) -> Self {
        Self { config }
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &PostProcessConfig {
        &self.config
    }

    /// Run the full post-processing pass: rerank → dedup → compress → context.
    pub fn process(&self, query: &str, chunks: Vec<ScoredChunk>) -> PostProcessed {
        let initial = chunks.len();

        let (chunks, reranked) = if self.config.rerank_enabled && chunks.len() > 1 {
            (self.rerank(query, chunks), true)
        } else {
            (chunks, false)
        };

        let chunks = deduplicate(chunks);

        let (chunks, compressed) =
            if self.config.compression_enabled && chunks.len() > self.config.max_chunks {
                (self.compress(chunks), true)
            } else {
                (chunks, false)
            };

        let context = build_context(&chunks);
        let total_compressed = initial - chunks.len();

        PostProcessed { chunks, context, total_compressed, reranked, compressed }
    }

    /// Recompute a composite score per chunk and sort descending.
    ///
    /// `composite = w.original * score + w.overlap * overlap_ratio +
    /// w.position * 1.0 + w.length * length_score`. The position component is
    /// the constant carried over from the source system.
    fn rerank(&self, query: &str, chunks: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
        let w = self.config.rerank_weights;
        let query_words: HashSet<String> =
            query.split_whitespace().map(|t| t.to_lowercase()).collect();

        let mut rescored: Vec<ScoredChunk> = chunks
            .into_iter()
            .map(|sc| {
                let overlap = word_overlap_ratio(&query_words, &sc.chunk.content);
                let length_score = length_score(sc.chunk.content.len());
                let composite = w.original * sc.score
                    + w.overlap * overlap
                    + w.position * 1.0
                    + w.length * length_score;
                ScoredChunk { chunk: sc.chunk, score: composite }
            })
            .collect();

        sort_by_score_desc(&mut rescored);
        rescored
    }

    /// Keep the top-scoring `max(round(len * ratio), max_chunks)` chunks.
    fn compress(&self, chunks: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
        let target = ((chunks.len() as f32 * self.config.compression_ratio).round() as usize)
            .max(self.config.max_chunks);
        let mut sorted = chunks;
        sort_by_score_desc(&mut sorted);
        sorted.truncate(target);
        sorted
    }
}

/// Fraction of query words present in the text, in `[0, 1]`.
fn word_overlap_ratio(query_words: &HashSet<String>, text: &str) -> f32 {
    if query_words.is_empty() {
        return 0.0;
    }
    let text_words: HashSet<String> = text.split_whitespace().map(|t| t.to_lowercase()).collect();
    let hits = query_words.iter().filter(|w| text_words.contains(*w)).count();
    hits as f32 / query_words.len() as f32
}

/// Peaks at 1.0 for chunks near the target length, floored at 0.1.
fn length_score(len: usize) -> f32 {
    (1.0 - (len as f32 - TARGET_CHUNK_LEN).abs() / TARGET_CHUNK_LEN).max(0.1)
}

/// Drop chunks whose trimmed-content prefix repeats, keeping the first
/// occurrence and preserving order.
fn deduplicate(chunks: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
    let mut seen: HashSet<String> = HashSet::new();
    chunks
        .into_iter()
        .filter(|sc| {
            let key: String = sc.chunk.content.trim().chars().take(DEDUP_PREFIX_CHARS).collect();
            seen.insert(key)
        })
        .collect()
}

fn sort_by_score_desc(chunks: &mut [ScoredChunk]) {
    chunks.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
}

fn build_context(chunks: &[ScoredChunk]) -> ContextInfo {
    let mut documents: HashMap<String, DocumentContext> = HashMap::new();
    for sc in chunks {
        let entry = documents.entry(sc.chunk.document_id.clone()).or_insert(DocumentContext {
            chunk_count: 0,
            avg_score: 0.0,
            chunk_ids: Vec::new(),
        });
        entry.chunk_count += 1;
        // Accumulate the sum here; divided once below.
        entry.avg_score += sc.score;
        entry.chunk_ids.push(sc.chunk.id.clone());
    }
    for doc in documents.values_mut() {
        doc.avg_score /= doc.chunk_count as f32;
    }

    let scores = if chunks.is_empty() {
        ScoreStats::default()
    } else {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0;
        for sc in chunks {
            min = min.min(sc.score);
            max = max.max(sc.score);
            sum += sc.score;
        }
        ScoreStats { min, max, avg: sum / chunks.len() as f32, count: chunks.len() }
    };

    ContextInfo { documents, scores }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PostProcessConfig;
    use crate::document::DocumentChunk;

    fn scored(id: &str, doc: &str, content: &str, score: f32) -> ScoredChunk {
        ScoredChunk { chunk: DocumentChunk::new(id, doc, content, 0), score }
    }

    #[test]
    fn dedup_keeps_first_occurrence_per_prefix() {
        let long = "x".repeat(150);
        let chunks = vec![
            scored("c1", "doc_1", &long, 0.9),
            scored("c2", "doc_1", &format!("{long}-different-tail"), 0.8),
            scored("c3", "doc_1", "unique content", 0.7),
        ];
        let processor = QueryPostProcessor::new(
            PostProcessConfig::builder().rerank_enabled(false).build().unwrap(),
        );
        let result = processor.process("query", chunks);
        // c1 and c2 share the 100-char prefix; c2 is dropped.
        let ids: Vec<&str> = result.chunks.iter().map(|c| c.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);
    }

    #[test]
    fn dedup_ignores_leading_whitespace() {
        let chunks = vec![
            scored("c1", "doc_1", "same text", 0.9),
            scored("c2", "doc_1", "   same text", 0.8),
        ];
        let processor = QueryPostProcessor::new(
            PostProcessConfig::builder().rerank_enabled(false).build().unwrap(),
        );
        let result = processor.process("query", chunks);
        assert_eq!(result.chunks.len(), 1);
        assert_eq!(result.chunks[0].chunk.id, "c1");
    }

    #[test]
    fn compression_respects_target_count() {
        let chunks: Vec<ScoredChunk> = (0..20)
            .map(|i| scored(&format!("c{i}"), "doc_1", &format!("content {i}"), i as f32 / 20.0))
            .collect();
        let config = PostProcessConfig::builder()
            .rerank_enabled(false)
            .max_chunks(5)
            .compression_ratio(0.5)
            .build()
            .unwrap();
        let processor = QueryPostProcessor::new(config);
        let result = processor.process("query", chunks);
        // target = max(round(20 * 0.5), 5) = 10, top-scoring kept.
        assert_eq!(result.chunks.len(), 10);
        assert!(result.compressed);
        assert!((result.chunks[0].score - 0.95).abs() < 1e-6);
        assert_eq!(result.total_compressed, 10);
    }

    #[test]
    fn compression_floor_is_max_chunks() {
        let chunks: Vec<ScoredChunk> = (0..12)
            .map(|i| scored(&format!("c{i}"), "doc_1", &format!("content {i}"), i as f32))
            .collect();
        let config = PostProcessConfig::builder()
            .rerank_enabled(false)
            .max_chunks(10)
            .compression_ratio(0.1)
            .build()
            .unwrap();
        let processor = QueryPostProcessor::new(config);
        let result = processor.process("query", chunks);
        // round(12 * 0.1) = 1, floored at max_chunks = 10.
        assert_eq!(result.chunks.len(), 10);
    }

    #[test]
    fn rerank_prefers_query_overlap() {
        let chunks = vec![
            scored("far", "doc_1", "completely unrelated words here", 0.6),
            scored("near", "doc_1", "rust ownership explained with examples", 0.6),
        ];
        let processor = QueryPostProcessor::new(PostProcessConfig::default());
        let result = processor.process("rust ownership", chunks);
        assert!(result.reranked);
        assert_eq!(result.chunks[0].chunk.id, "near");
    }

    #[test]
    fn single_chunk_skips_rerank() {
        let chunks = vec![scored("c1", "doc_1", "content", 0.4)];
        let processor = QueryPostProcessor::new(PostProcessConfig::default());
        let result = processor.process("query", chunks);
        assert!(!result.reranked);
        assert!((result.chunks[0].score - 0.4).abs() < 1e-6);
    }

    #[test]
    fn context_groups_by_document() {
        let chunks = vec![
            scored("c1", "doc_1", "alpha", 0.8),
            scored("c2", "doc_1", "beta", 0.6),
            scored("c3", "doc_2", "gamma", 0.4),
        ];
        let processor = QueryPostProcessor::new(
            PostProcessConfig::builder().rerank_enabled(false).build().unwrap(),
        );
        let result = processor.process("query", chunks);

        let doc1 = &result.context.documents["doc_1"];
        assert_eq!(doc1.chunk_count, 2);
        assert!((doc1.avg_score - 0.7).abs() < 1e-6);
        assert_eq!(doc1.chunk_ids, vec!["c1", "c2"]);

        let stats = &result.context.scores;
        assert_eq!(stats.count, 3);
        assert!((stats.min - 0.4).abs() < 1e-6);
        assert!((stats.max - 0.8).abs() < 1e-6);
        assert!((stats.avg - 0.6).abs() < 1e-6);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let processor = QueryPostProcessor::new(PostProcessConfig::default());
        let result = processor.process("query", Vec::new());
        assert!(result.chunks.is_empty());
        assert_eq!(result.context.scores.count, 0);
        assert_eq!(result.total_compressed, 0);
        assert!(!result.reranked);
        assert!(!result.compressed);
    }
}
