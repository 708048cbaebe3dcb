//! Data types for evaluation samples, metric scores, and stored records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The quality metrics an [`Evaluator`](crate::evaluator::Evaluator) can compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// How well the answer is supported by the retrieved contexts.
    Faithfulness,
    /// How well the answer addresses the question.
    AnswerRelevancy,
    /// How relevant the retrieved contexts are to the question.
    ContextPrecision,
    /// How much of the ground truth the contexts cover.
    ContextRecall,
}

impl MetricKind {
    /// All metrics, in canonical order.
    pub fn all() -> [MetricKind; 4] {
        [
            MetricKind::Faithfulness,
            MetricKind::AnswerRelevancy,
            MetricKind::ContextPrecision,
            MetricKind::ContextRecall,
        ]
    }

    /// Snake-case name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Faithfulness => "faithfulness",
            MetricKind::AnswerRelevancy => "answer_relevancy",
            MetricKind::ContextPrecision => "context_precision",
            MetricKind::ContextRecall => "context_recall",
        }
    }
}

/// One recorded query/answer/context triple awaiting evaluation.
///
/// Created by [`record_query`](crate::runtime::RuntimeEvaluator::record_query)
/// and immutable from then on; it lives in the pending queue until a batch
/// flush or worker pickup consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSample {
    /// Caller-supplied ID, unique per logical query.
    pub query_id: String,
    /// The user's question.
    pub question: String,
    /// The generated answer.
    pub answer: String,
    /// Retrieved text spans the answer was grounded on, in rank order.
    pub contexts: Vec<String>,
    /// Reference answer, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ground_truth: Option<String>,
    /// Free-form sample metadata.
    pub metadata: HashMap<String, String>,
    /// Set at creation, immutable.
    pub timestamp: DateTime<Utc>,
}

impl EvaluationSample {
    /// Create a sample timestamped now, with no ground truth or metadata.
    pub fn new(
        query_id: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
        contexts: Vec<String>,
    ) -> Self {
        Self {
            query_id: query_id.into(),
            question: question.into(),
            answer: answer.into(),
            contexts,
            ground_truth: None,
            metadata: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach a reference answer.
    pub fn with_ground_truth(mut self, ground_truth: impl Into<String>) -> Self {
        self.ground_truth = Some(ground_truth.into());
        self
    }

    /// Insert a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// The outcome of one evaluation run (single sample or batch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Per-metric mean scores over the evaluated samples.
    pub scores: HashMap<MetricKind, f64>,
    /// Per-sample scores, in input order, when the evaluator provides them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_sample: Option<Vec<HashMap<MetricKind, f64>>>,
    /// Free-form run metadata.
    pub metadata: HashMap<String, String>,
}

/// A stored evaluation outcome, as kept in the ring buffer and serialized to
/// the JSON-lines results file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvaluationRecord {
    /// One batch evaluation over several queued samples.
    Batch {
        timestamp: DateTime<Utc>,
        /// Query IDs of the evaluated samples.
        queries: Vec<String>,
        avg_scores: HashMap<MetricKind, f64>,
        sample_count: usize,
    },
    /// One single-sample evaluation.
    Single {
        timestamp: DateTime<Utc>,
        query_id: String,
        scores: HashMap<MetricKind, f64>,
    },
}

impl EvaluationRecord {
    /// The per-metric scores this record carries (averages for batches).
    pub fn scores(&self) -> &HashMap<MetricKind, f64> {
        match self {
            EvaluationRecord::Batch { avg_scores, .. } => avg_scores,
            EvaluationRecord::Single { scores, .. } => scores,
        }
    }

    /// When this record was produced.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            EvaluationRecord::Batch { timestamp, .. } => *timestamp,
            EvaluationRecord::Single { timestamp, .. } => *timestamp,
        }
    }
}
