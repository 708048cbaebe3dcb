//! Caller-supplied search constraints.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::DocumentChunk;

/// Optional constraints narrowing a retrieval call.
///
/// `document_ids` is pushed down to the vector store; the remaining
/// constraints are applied locally against chunk metadata after search.
/// Metadata keys consulted: `file_type`, `status`, `tags` (comma-separated),
/// `created_at` (RFC 3339), `file_size` (bytes).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Restrict results to chunks of these documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_ids: Option<HashSet<String>>,
    /// Allowed source file types (e.g. `pdf`, `md`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_types: Option<HashSet<String>>,
    /// Allowed document statuses (e.g. `indexed`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statuses: Option<HashSet<String>>,
    /// Required tags; a chunk matches if it carries at least one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashSet<String>>,
    /// Only documents created at or after this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_after: Option<DateTime<Utc>>,
    /// Only documents created at or before this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_before: Option<DateTime<Utc>>,
    /// Minimum source file size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,
    /// Maximum source file size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
}

impl SearchFilter {
    /// Create an empty filter that matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict results to the given document IDs.
    pub fn with_document_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.document_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict results to the given file types.
    pub fn with_file_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict results to the given document statuses.
    pub fn with_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statuses = Some(statuses.into_iter().map(Into::into).collect());
        self
    }

    /// Require at least one of the given tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict results to documents created within `[after, before]`.
    pub fn with_created_between(
        mut self,
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_after = after;
        self.created_before = before;
        self
    }

    /// Restrict results to source files within `[min, max]` bytes.
    pub fn with_size_range(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_size = min;
        self.max_size = max;
        self
    }

    /// Whether any constraint beyond `document_ids` is set.
    pub fn has_local_constraints(&self) -> bool {
        self.file_types.is_some()
            || self.statuses.is_some()
            || self.tags.is_some()
            || self.created_after.is_some()
            || self.created_before.is_some()
            || self.min_size.is_some()
            || self.max_size.is_some()
    }

    /// Test a chunk against all constraints.
    ///
    /// Constraints a chunk's metadata does not speak to are treated as
    /// non-matching only when the constraint is set and the metadata key is
    /// present with a conflicting value; absent keys fail closed for set
    /// constraints (`file_types`, `statuses`, `tags`) and pass for range
    /// constraints (dates, sizes).
    pub fn matches(&self, chunk: &DocumentChunk) -> bool {
        if let Some(ids) = &self.document_ids {
            if !ids.contains(&chunk.document_id) {
                return false;
            }
        }
        if let Some(types) = &self.file_types {
            match chunk.metadata.get("file_type") {
                Some(t) if types.contains(t) => {}
                _ => return false,
            }
        }
        if let Some(statuses) = &self.statuses {
            match chunk.metadata.get("status") {
                Some(s) if statuses.contains(s) => {}
                _ => return false,
            }
        }
        if let Some(tags) = &self.tags {
            let chunk_tags: HashSet<&str> = chunk
                .metadata
                .get("tags")
                .map(|t| t.split(',').map(str::trim).collect())
                .unwrap_or_default();
            if !tags.iter().any(|t| chunk_tags.contains(t.as_str())) {
                return false;
            }
        }
        if self.created_after.is_some() || self.created_before.is_some() {
            if let Some(created) = chunk
                .metadata
                .get("created_at")
                .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            {
                let created = created.with_timezone(&Utc);
                if self.created_after.is_some_and(|after| created < after) {
                    return false;
                }
                if self.created_before.is_some_and(|before| created > before) {
                    return false;
                }
            }
        }
        if self.min_size.is_some() || self.max_size.is_some() {
            if let Some(size) = chunk.metadata.get("file_size").and_then(|v| v.parse::<u64>().ok())
            {
                if self.min_size.is_some_and(|min| size < min) {
                    return false;
                }
                if self.max_size.is_some_and(|max| size > max) {
                    return false;
                }
            }
        }
        true
    }
}
