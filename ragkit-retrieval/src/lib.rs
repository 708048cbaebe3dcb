//! Multi-strategy document retrieval and re-ranking for RAG backends.
//!
//! This crate provides:
//! - Content analysis (content type, language, complexity)
//! - Query pre-processing (cleaning, expansion, intent, strategy selection)
//! - A strategy-dispatching [`Retriever`] with hybrid score fusion
//! - Post-processing (rerank, dedup, compression, context statistics)
//! - [`VectorStore`] / [`DocumentRepository`] collaborator traits and an
//!   in-memory reference store

mod analysis;
mod config;
mod document;
mod error;
mod filter;
mod inmemory;
mod postprocess;
mod query;
mod repository;
mod retriever;
mod vectorstore;

pub use analysis::{ContentAnalyzer, ContentType, Language};
pub use config::{
    PostProcessConfig, PostProcessConfigBuilder, RerankWeights, RetrieverConfig,
    RetrieverConfigBuilder,
};
pub use document::{DocumentChunk, QueryResult, ScoredChunk};
pub use error::{Result, RetrievalError};
pub use filter::SearchFilter;
pub use inmemory::InMemoryVectorStore;
pub use postprocess::{
    ContextInfo, DocumentContext, PostProcessed, QueryPostProcessor, ScoreStats,
};
pub use query::{ProcessedQuery, QueryPreProcessor, QueryType, RetrievalStrategy};
pub use repository::DocumentRepository;
pub use retriever::{RetrieveOptions, Retriever, RetrieverBuilder};
pub use vectorstore::VectorStore;
