//! Evaluation result storage: in-memory ring buffer plus optional
//! JSON-lines persistence.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tokio::io::AsyncWriteExt;

use crate::error::{EvalError, Result};
use crate::sample::{EvaluationRecord, MetricKind};

/// Append-only store for evaluation records.
///
/// Keeps the most recent `max_results` records in memory (oldest evicted
/// first) and, when a path is configured, appends one JSON line per record.
/// The buffer and the file never disagree on order; the file simply keeps
/// everything while the buffer forgets.
#[derive(Debug)]
pub struct ResultStore {
    max_results: usize,
    results_path: Option<PathBuf>,
    buffer: Mutex<VecDeque<EvaluationRecord>>,
}

impl ResultStore {
    /// Create a store holding at most `max_results` records in memory,
    /// persisting to `results_path` when given.
    pub fn new(max_results: usize, results_path: Option<PathBuf>) -> Self {
        Self { max_results, results_path, buffer: Mutex::new(VecDeque::new()) }
    }

    /// Append a record to the ring buffer and, if configured, the results file.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::StorageError`] if the file append fails; the
    /// in-memory buffer is updated regardless.
    pub async fn append(&self, record: EvaluationRecord) -> Result<()> {
        {
            let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
            if buffer.len() == self.max_results {
                buffer.pop_front();
            }
            buffer.push_back(record.clone());
        }

        if let Some(path) = &self.results_path {
            append_json_line(path, &record).await?;
        }
        Ok(())
    }

    /// The most recent records, newest first, at most `limit`.
    pub fn recent(&self, limit: usize) -> Vec<EvaluationRecord> {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.iter().rev().take(limit).cloned().collect()
    }

    /// Per-metric mean over the in-memory buffer; empty when no records.
    pub fn avg_scores(&self) -> HashMap<MetricKind, f64> {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut sums: HashMap<MetricKind, (f64, usize)> = HashMap::new();
        for record in buffer.iter() {
            for (&metric, &score) in record.scores() {
                let entry = sums.entry(metric).or_insert((0.0, 0));
                entry.0 += score;
                entry.1 += 1;
            }
        }
        sums.into_iter().map(|(metric, (sum, count))| (metric, sum / count as f64)).collect()
    }

    /// Number of records currently held in memory.
    pub fn len(&self) -> usize {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the in-memory buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn append_json_line(path: &Path, record: &EvaluationRecord) -> Result<()> {
    let mut line = serde_json::to_string(record)
        .map_err(|e| EvalError::StorageError(format!("failed to serialize record: {e}")))?;
    line.push('\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| {
            EvalError::StorageError(format!("failed to open '{}': {e}", path.display()))
        })?;
    file.write_all(line.as_bytes()).await.map_err(|e| {
        EvalError::StorageError(format!("failed to append to '{}': {e}", path.display()))
    })?;
    Ok(())
}

/// Read every record from a JSON-lines results file, oldest first.
///
/// # Errors
///
/// Returns [`EvalError::StorageError`] if the file cannot be read or a line
/// fails to parse.
pub async fn read_records(path: &Path) -> Result<Vec<EvaluationRecord>> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        EvalError::StorageError(format!("failed to read '{}': {e}", path.display()))
    })?;
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .map_err(|e| EvalError::StorageError(format!("malformed record line: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn single(query_id: &str, score: f64) -> EvaluationRecord {
        EvaluationRecord::Single {
            timestamp: Utc::now(),
            query_id: query_id.to_string(),
            scores: HashMap::from([(MetricKind::Faithfulness, score)]),
        }
    }

    #[tokio::test]
    async fn ring_buffer_evicts_oldest() {
        let store = ResultStore::new(2, None);
        store.append(single("q1", 0.1)).await.unwrap();
        store.append(single("q2", 0.2)).await.unwrap();
        store.append(single("q3", 0.3)).await.unwrap();

        assert_eq!(store.len(), 2);
        let recent = store.recent(10);
        assert!(matches!(&recent[0], EvaluationRecord::Single { query_id, .. } if query_id == "q3"));
        assert!(matches!(&recent[1], EvaluationRecord::Single { query_id, .. } if query_id == "q2"));
    }

    #[tokio::test]
    async fn avg_scores_averages_buffer() {
        let store = ResultStore::new(10, None);
        store.append(single("q1", 0.2)).await.unwrap();
        store.append(single("q2", 0.6)).await.unwrap();

        let avgs = store.avg_scores();
        assert!((avgs[&MetricKind::Faithfulness] - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn recent_respects_limit() {
        let store = ResultStore::new(10, None);
        for i in 0..5 {
            store.append(single(&format!("q{i}"), 0.5)).await.unwrap();
        }
        assert_eq!(store.recent(3).len(), 3);
        assert!(store.recent(0).is_empty());
    }
}
