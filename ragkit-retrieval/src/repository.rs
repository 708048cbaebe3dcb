//! Document repository trait.

use async_trait::async_trait;

use crate::document::DocumentChunk;
use crate::error::Result;

/// Read-only access to the chunks of ingested documents.
///
/// The retrieval core never mutates repository contents; ingestion lives
/// elsewhere.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Fetch all chunks of a document, ordered by `chunk_index`.
    ///
    /// An unknown document ID returns an empty `Vec`.
    async fn get_chunks_by_document(&self, document_id: &str) -> Result<Vec<DocumentChunk>>;
}
