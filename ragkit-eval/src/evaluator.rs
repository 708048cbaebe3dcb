//! Evaluation collaborator trait and the built-in heuristic scorer.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::error::Result;
use crate::sample::{EvaluationResult, EvaluationSample, MetricKind};

/// Computes quality metrics over evaluation samples.
///
/// Real implementations may call out to an LLM judge; scoring is therefore
/// async and fallible. Scores are in `[0, 1]`.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Score `samples` on the requested `metrics`.
    ///
    /// Returns per-metric means over the batch and, when available,
    /// per-sample scores in input order.
    async fn evaluate(
        &self,
        samples: &[EvaluationSample],
        metrics: &[MetricKind],
    ) -> Result<EvaluationResult>;
}

/// A local, deterministic, reference-free scorer based on token overlap.
///
/// Cheap enough to run inline on every sampled query. The scores are crude
/// proxies for the RAGAS metrics of the same names; swap in an LLM-backed
/// [`Evaluator`] where judgment quality matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEvaluator;

impl HeuristicEvaluator {
    /// Create a new heuristic evaluator.
    pub fn new() -> Self {
        Self
    }

    fn score_sample(sample: &EvaluationSample, metric: MetricKind) -> f64 {
        match metric {
            MetricKind::Faithfulness => faithfulness(sample),
            MetricKind::AnswerRelevancy => answer_relevancy(sample),
            MetricKind::ContextPrecision => context_precision(sample),
            MetricKind::ContextRecall => context_recall(sample),
        }
    }
}

#[async_trait]
impl Evaluator for HeuristicEvaluator {
    async fn evaluate(
        &self,
        samples: &[EvaluationSample],
        metrics: &[MetricKind],
    ) -> Result<EvaluationResult> {
        let per_sample: Vec<HashMap<MetricKind, f64>> = samples
            .iter()
            .map(|sample| {
                metrics.iter().map(|&metric| (metric, Self::score_sample(sample, metric))).collect()
            })
            .collect();

        let mut scores = HashMap::new();
        if !samples.is_empty() {
            for &metric in metrics {
                let sum: f64 = per_sample.iter().map(|s| s[&metric]).sum();
                scores.insert(metric, sum / samples.len() as f64);
            }
        }

        let mut metadata = HashMap::new();
        metadata.insert("evaluator".to_string(), "heuristic".to_string());
        metadata.insert("sample_count".to_string(), samples.len().to_string());

        Ok(EvaluationResult { scores, per_sample: Some(per_sample), metadata })
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn context_tokens(sample: &EvaluationSample) -> HashSet<String> {
    sample.contexts.iter().flat_map(|c| tokenize(c)).collect()
}

/// Fraction of answer tokens supported by the retrieved contexts.
fn faithfulness(sample: &EvaluationSample) -> f64 {
    let answer = tokenize(&sample.answer);
    if answer.is_empty() {
        return 0.0;
    }
    let contexts = context_tokens(sample);
    let supported = answer.iter().filter(|t| contexts.contains(*t)).count();
    supported as f64 / answer.len() as f64
}

/// Fraction of question tokens addressed by the answer.
fn answer_relevancy(sample: &EvaluationSample) -> f64 {
    let question = tokenize(&sample.question);
    if question.is_empty() {
        return 0.0;
    }
    let answer = tokenize(&sample.answer);
    let covered = question.iter().filter(|t| answer.contains(*t)).count();
    covered as f64 / question.len() as f64
}

/// Mean per-context fraction of question tokens present in that context.
fn context_precision(sample: &EvaluationSample) -> f64 {
    let question = tokenize(&sample.question);
    if question.is_empty() || sample.contexts.is_empty() {
        return 0.0;
    }
    let total: f64 = sample
        .contexts
        .iter()
        .map(|context| {
            let tokens = tokenize(context);
            let covered = question.iter().filter(|t| tokens.contains(*t)).count();
            covered as f64 / question.len() as f64
        })
        .sum();
    total / sample.contexts.len() as f64
}

/// Fraction of ground-truth tokens covered by the contexts.
///
/// Without a ground truth there is nothing to recall against; the score is a
/// neutral 1.0 so the metric never penalizes unlabeled traffic.
fn context_recall(sample: &EvaluationSample) -> f64 {
    let Some(ground_truth) = &sample.ground_truth else {
        return 1.0;
    };
    let truth = tokenize(ground_truth);
    if truth.is_empty() {
        return 1.0;
    }
    let contexts = context_tokens(sample);
    let covered = truth.iter().filter(|t| contexts.contains(*t)).count();
    covered as f64 / truth.len() as f64
}
