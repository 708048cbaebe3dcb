//! Property tests for search ordering, result bounds, deduplication, and
//! query pre-processing totality.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use proptest::prelude::*;
use ragkit_retrieval::{
    DocumentChunk, InMemoryVectorStore, PostProcessConfig, QueryPostProcessor, QueryPreProcessor,
    RetrieveOptions, Retriever, RetrieverConfig, ScoredChunk, VectorStore,
};

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// Generate a chunk with a normalized embedding.
fn arb_chunk(dim: usize) -> impl Strategy<Value = DocumentChunk> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", arb_normalized_embedding(dim)).prop_map(
        |(id, content, embedding)| {
            DocumentChunk::new(id, "doc_1", content, 0).with_embedding(embedding)
        },
    )
}

/// *For any* set of embedded chunks, vector search returns results ordered by
/// descending score and bounded by `top_k`.
mod prop_vector_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            chunks in proptest::collection::vec(arb_chunk(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, unique_count) = rt.block_on(async {
                let store = InMemoryVectorStore::new();

                // Deduplicate chunks by id to avoid upsert overwriting
                let mut deduped: HashMap<String, DocumentChunk> = HashMap::new();
                for chunk in &chunks {
                    deduped.entry(chunk.id.clone()).or_insert_with(|| chunk.clone());
                }
                let unique_chunks: Vec<DocumentChunk> = deduped.into_values().collect();
                let count = unique_chunks.len();

                store.upsert(&unique_chunks).await;
                let results = store.search_by_vector(&query, top_k, None).await.unwrap();
                (results, count)
            });

            prop_assert!(results.len() <= top_k);
            prop_assert!(results.len() <= unique_count);

            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }
    }
}

/// *For any* scored chunk list, post-processing leaves no two chunks sharing
/// the same trimmed 100-character content prefix.
mod prop_dedup_prefix_uniqueness {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn surviving_prefixes_are_unique(
            contents in proptest::collection::vec("[ab ]{0,12}", 1..30),
        ) {
            let chunks: Vec<ScoredChunk> = contents
                .iter()
                .enumerate()
                .map(|(i, content)| ScoredChunk {
                    chunk: DocumentChunk::new(format!("c{i}"), "doc_1", content.clone(), i),
                    score: 0.5,
                })
                .collect();

            let config = PostProcessConfig::builder()
                .rerank_enabled(false)
                .compression_enabled(false)
                .build()
                .unwrap();
            let result = QueryPostProcessor::new(config).process("query", chunks);

            let prefixes: HashSet<String> = result
                .chunks
                .iter()
                .map(|sc| sc.chunk.content.trim().chars().take(100).collect())
                .collect();
            prop_assert_eq!(prefixes.len(), result.chunks.len());
        }
    }
}

/// *For any* store contents and query, end-to-end retrieval returns at most
/// `top_k` chunks and never reports an error for healthy collaborators.
mod prop_retrieve_bounded {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn retrieve_is_bounded_and_infallible(
            contents in proptest::collection::vec("[a-d ]{3,20}", 0..15),
            query in "[a-d ]{1,10}",
            top_k in 1usize..8,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result = rt.block_on(async {
                let store = Arc::new(InMemoryVectorStore::new());
                let chunks: Vec<DocumentChunk> = contents
                    .iter()
                    .enumerate()
                    .map(|(i, content)| {
                        DocumentChunk::new(format!("c{i}"), "doc_1", content.clone(), i)
                    })
                    .collect();
                store.upsert(&chunks).await;

                let config = RetrieverConfig::builder()
                    .similarity_threshold(0.0)
                    .build()
                    .unwrap();
                let retriever = Retriever::builder()
                    .config(config)
                    .vector_store(store.clone())
                    .repository(store)
                    .build()
                    .unwrap();

                retriever.retrieve(&query, RetrieveOptions::default().with_top_k(top_k)).await
            });

            prop_assert!(result.error.is_none());
            prop_assert!(result.chunks.len() <= top_k);
            for window in result.chunks.windows(2) {
                prop_assert!(window[0].score >= window[1].score);
            }
        }
    }
}

/// *For any* input string, query pre-processing completes with bounded
/// complexity metadata.
mod prop_preprocess_total {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn process_is_total_with_bounded_complexity(query in ".{0,200}") {
            let result = QueryPreProcessor::new().process(&query);
            let complexity: f32 = result.metadata["complexity"].parse().unwrap();
            prop_assert!((0.0..=1.0).contains(&complexity));
            prop_assert!(result.metadata.contains_key("word_count"));
        }
    }
}
