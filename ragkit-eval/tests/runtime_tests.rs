//! End-to-end runtime evaluation tests: scheduling modes, batch flushes,
//! shutdown draining, error accounting, and persistence.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ragkit_eval::{
    EvalError, EvaluationMode, EvaluationRecord, EvaluationResult, EvaluationSample, Evaluator,
    MetricKind, Result, RuntimeEvaluationConfig, RuntimeEvaluator, read_records,
};

fn sample(id: &str) -> EvaluationSample {
    EvaluationSample::new(
        id,
        "what is rust ownership",
        "ownership is the memory model of rust",
        vec!["ownership is the memory model of rust explained".to_string()],
    )
}

/// Poll `cond` for up to two seconds; panics if it never holds.
async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 2s");
}

struct FailingEvaluator;

#[async_trait]
impl Evaluator for FailingEvaluator {
    async fn evaluate(
        &self,
        _samples: &[EvaluationSample],
        _metrics: &[MetricKind],
    ) -> Result<EvaluationResult> {
        Err(EvalError::EvaluatorError("judge offline".to_string()))
    }
}

#[tokio::test]
async fn async_all_evaluates_every_query() {
    let config =
        RuntimeEvaluationConfig::builder().mode(EvaluationMode::AsyncAll).build().unwrap();
    let evaluator = RuntimeEvaluator::builder().config(config).build().unwrap();

    for i in 0..3 {
        evaluator.record_query(sample(&format!("q{i}")));
    }
    // Closing the channel drains the outstanding samples before returning.
    evaluator.stop().await;

    let stats = evaluator.get_stats();
    assert_eq!(stats.total_queries, 3);
    assert_eq!(stats.evaluated_queries, 3);
    assert_eq!(stats.skipped_queries, 0);
    assert_eq!(stats.evaluation_errors, 0);
    assert!((stats.evaluation_rate - 1.0).abs() < 1e-9);
    assert!(stats.recent_avg_scores.contains_key(&MetricKind::Faithfulness));

    let recent = evaluator.get_recent_results(10);
    assert_eq!(recent.len(), 3);
    assert!(recent.iter().all(|r| matches!(r, EvaluationRecord::Single { .. })));
}

#[tokio::test]
async fn sampling_rate_zero_skips_all() {
    let config = RuntimeEvaluationConfig::builder()
        .mode(EvaluationMode::Sampling)
        .sampling_rate(0.0)
        .build()
        .unwrap();
    let evaluator = RuntimeEvaluator::builder().config(config).build().unwrap();

    for i in 0..10 {
        evaluator.record_query(sample(&format!("q{i}")));
    }
    evaluator.stop().await;

    let stats = evaluator.get_stats();
    assert_eq!(stats.total_queries, 10);
    assert_eq!(stats.skipped_queries, 10);
    assert_eq!(stats.evaluated_queries, 0);
}

#[tokio::test]
async fn sampling_rate_one_evaluates_all() {
    let config = RuntimeEvaluationConfig::builder()
        .mode(EvaluationMode::Sampling)
        .sampling_rate(1.0)
        .build()
        .unwrap();
    let evaluator = RuntimeEvaluator::builder().config(config).build().unwrap();

    for i in 0..5 {
        evaluator.record_query(sample(&format!("q{i}")));
    }
    evaluator.stop().await;

    let stats = evaluator.get_stats();
    assert_eq!(stats.evaluated_queries, 5);
    assert_eq!(stats.skipped_queries, 0);
}

#[tokio::test]
async fn batch_flushes_when_size_reached() {
    let config = RuntimeEvaluationConfig::builder()
        .mode(EvaluationMode::Batch)
        .batch_size(3)
        .batch_interval(Duration::from_secs(60))
        .build()
        .unwrap();
    let evaluator = RuntimeEvaluator::builder().config(config).build().unwrap();

    for i in 0..3 {
        evaluator.record_query(sample(&format!("q{i}")));
    }
    wait_until(|| evaluator.get_stats().evaluated_queries == 3).await;

    let recent = evaluator.get_recent_results(1);
    match &recent[0] {
        EvaluationRecord::Batch { queries, sample_count, avg_scores, .. } => {
            assert_eq!(*sample_count, 3);
            assert_eq!(queries.len(), 3);
            assert!(avg_scores.contains_key(&MetricKind::AnswerRelevancy));
        }
        other => panic!("expected a batch record, got {other:?}"),
    }
    evaluator.stop().await;
}

#[tokio::test]
async fn stop_flushes_a_partial_batch() {
    let config = RuntimeEvaluationConfig::builder()
        .mode(EvaluationMode::Batch)
        .batch_size(10)
        .batch_interval(Duration::from_secs(60))
        .build()
        .unwrap();
    let evaluator = RuntimeEvaluator::builder().config(config).build().unwrap();

    evaluator.record_query(sample("q1"));
    evaluator.record_query(sample("q2"));
    assert_eq!(evaluator.get_stats().evaluated_queries, 0);

    evaluator.stop().await;

    let stats = evaluator.get_stats();
    assert_eq!(stats.evaluated_queries, 2);
    let recent = evaluator.get_recent_results(1);
    assert!(matches!(&recent[0], EvaluationRecord::Batch { sample_count: 2, .. }));
}

#[tokio::test]
async fn evaluator_failures_are_counted_not_raised() {
    let config =
        RuntimeEvaluationConfig::builder().mode(EvaluationMode::AsyncAll).build().unwrap();
    let evaluator = RuntimeEvaluator::builder()
        .config(config)
        .evaluator(Arc::new(FailingEvaluator))
        .build()
        .unwrap();

    evaluator.record_query(sample("q1"));
    evaluator.record_query(sample("q2"));
    evaluator.stop().await;

    let stats = evaluator.get_stats();
    assert_eq!(stats.total_queries, 2);
    assert_eq!(stats.evaluation_errors, 2);
    assert_eq!(stats.evaluated_queries, 0);
    assert!(evaluator.get_recent_results(10).is_empty());
}

#[tokio::test]
async fn record_after_stop_counts_as_skipped() {
    let config =
        RuntimeEvaluationConfig::builder().mode(EvaluationMode::AsyncAll).build().unwrap();
    let evaluator = RuntimeEvaluator::builder().config(config).build().unwrap();
    evaluator.stop().await;

    evaluator.record_query(sample("late"));

    let stats = evaluator.get_stats();
    assert_eq!(stats.total_queries, 1);
    assert_eq!(stats.skipped_queries, 1);
}

#[tokio::test]
async fn results_persist_as_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eval_results.jsonl");

    let config = RuntimeEvaluationConfig::builder()
        .mode(EvaluationMode::AsyncAll)
        .results_path(&path)
        .build()
        .unwrap();
    let evaluator = RuntimeEvaluator::builder().config(config).build().unwrap();

    evaluator.record_query(sample("q1"));
    evaluator.record_query(sample("q2"));
    evaluator.stop().await;

    let records = read_records(&path).await.unwrap();
    assert_eq!(records.len(), 2);
    let ids: Vec<&str> = records
        .iter()
        .map(|r| match r {
            EvaluationRecord::Single { query_id, .. } => query_id.as_str(),
            other => panic!("expected single records, got {other:?}"),
        })
        .collect();
    assert_eq!(ids, vec!["q1", "q2"]);
}
