//! Runtime evaluation scheduling: per-query sampling decisions, a
//! fire-and-forget worker channel, and the background batch loop.
//!
//! The [`RuntimeEvaluator`] sits after answer generation in a RAG request
//! path. [`record_query`](RuntimeEvaluator::record_query) is synchronous and
//! non-blocking by construction: samples go into a queue or a bounded
//! channel, and all scoring happens on background tasks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{EvaluationMode, RuntimeEvaluationConfig};
use crate::error::{EvalError, Result};
use crate::evaluator::{Evaluator, HeuristicEvaluator};
use crate::sample::{EvaluationRecord, EvaluationSample, MetricKind};
use crate::storage::ResultStore;

/// Bookkeeping counters, updated with relaxed ordering; exact cross-counter
/// consistency is not required by the stats contract.
#[derive(Debug, Default)]
struct Counters {
    total: AtomicU64,
    evaluated: AtomicU64,
    skipped: AtomicU64,
    errors: AtomicU64,
}

/// Everything a background evaluation needs, cheap to clone into tasks.
#[derive(Clone)]
struct EvalContext {
    evaluator: Arc<dyn Evaluator>,
    store: Arc<ResultStore>,
    counters: Arc<Counters>,
    metrics: Vec<MetricKind>,
}

/// A point-in-time snapshot of evaluation bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationStats {
    /// Queries seen by [`record_query`](RuntimeEvaluator::record_query).
    pub total_queries: u64,
    /// Queries successfully evaluated (samples, for batches).
    pub evaluated_queries: u64,
    /// Queries not selected for evaluation.
    pub skipped_queries: u64,
    /// Evaluation and storage failures, counted per affected sample.
    pub evaluation_errors: u64,
    /// `evaluated_queries / total_queries`, 0 when no queries were seen.
    pub evaluation_rate: f64,
    /// Per-metric mean over the in-memory result buffer.
    pub recent_avg_scores: HashMap<MetricKind, f64>,
}

/// Decides per query whether to evaluate and schedules the work.
///
/// The mode is fixed at construction. Background tasks (the batch loop in
/// [`EvaluationMode::Batch`], the worker in `Sampling`/`AsyncAll`) are
/// spawned by [`build()`](RuntimeEvaluatorBuilder::build), so construction
/// must happen inside a Tokio runtime. Call
/// [`stop()`](RuntimeEvaluator::stop) for a clean shutdown with a final
/// flush.
///
/// # Example
///
/// ```rust,ignore
/// use ragkit_eval::{EvaluationMode, EvaluationSample, RuntimeEvaluationConfig, RuntimeEvaluator};
///
/// let config = RuntimeEvaluationConfig::builder()
///     .mode(EvaluationMode::Sampling)
///     .sampling_rate(0.25)
///     .build()?;
/// let evaluator = RuntimeEvaluator::builder().config(config).build()?;
///
/// evaluator.record_query(EvaluationSample::new("q1", question, answer, contexts));
/// let stats = evaluator.get_stats();
/// ```
pub struct RuntimeEvaluator {
    config: RuntimeEvaluationConfig,
    ctx: EvalContext,
    pending: Arc<Mutex<Vec<EvaluationSample>>>,
    sample_tx: Mutex<Option<mpsc::Sender<EvaluationSample>>>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RuntimeEvaluator {
    /// Create a new [`RuntimeEvaluatorBuilder`].
    pub fn builder() -> RuntimeEvaluatorBuilder {
        RuntimeEvaluatorBuilder::default()
    }

    /// Return a reference to the evaluator configuration.
    pub fn config(&self) -> &RuntimeEvaluationConfig {
        &self.config
    }

    /// Whether the current query should be evaluated.
    ///
    /// `Disabled` never evaluates; `AsyncAll` and `Batch` always do (batch
    /// cadence does the thinning); `Sampling` draws uniformly per call.
    pub fn should_evaluate(&self) -> bool {
        match self.config.mode {
            EvaluationMode::Disabled => false,
            EvaluationMode::AsyncAll | EvaluationMode::Batch => true,
            EvaluationMode::Sampling => {
                rand::thread_rng().gen_range(0.0..1.0) < self.config.sampling_rate
            }
        }
    }

    /// Record a completed query for possible evaluation.
    ///
    /// Never blocks and never fails: unselected queries are counted and
    /// dropped; in batch mode the sample joins the pending queue (with an
    /// immediate flush when the queue reaches `batch_size`); otherwise it is
    /// handed to the worker channel, and a full channel drops the sample
    /// with an error count rather than stalling the request path.
    pub fn record_query(&self, sample: EvaluationSample) {
        self.ctx.counters.total.fetch_add(1, Ordering::Relaxed);

        if !self.should_evaluate() {
            self.ctx.counters.skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        match self.config.mode {
            EvaluationMode::Batch => {
                let full_batch = {
                    let mut pending =
                        self.pending.lock().unwrap_or_else(PoisonError::into_inner);
                    pending.push(sample);
                    if pending.len() >= self.config.batch_size {
                        Some(std::mem::take(&mut *pending))
                    } else {
                        None
                    }
                };
                if let Some(batch) = full_batch {
                    debug!(sample_count = batch.len(), "batch size reached, flushing");
                    let ctx = self.ctx.clone();
                    tokio::spawn(async move {
                        run_batch(&ctx, batch).await;
                    });
                }
            }
            EvaluationMode::Sampling | EvaluationMode::AsyncAll => {
                let tx = self
                    .sample_tx
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                match tx {
                    Some(tx) => {
                        if let Err(e) = tx.try_send(sample) {
                            self.ctx.counters.errors.fetch_add(1, Ordering::Relaxed);
                            warn!(error = %e, "evaluation queue full, dropping sample");
                        }
                    }
                    // stop() already ran; treat like a skipped query.
                    None => {
                        self.ctx.counters.skipped.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            EvaluationMode::Disabled => {}
        }
    }

    /// Snapshot the bookkeeping counters and recent score averages.
    pub fn get_stats(&self) -> EvaluationStats {
        let total = self.ctx.counters.total.load(Ordering::Relaxed);
        let evaluated = self.ctx.counters.evaluated.load(Ordering::Relaxed);
        let rate = if total == 0 { 0.0 } else { evaluated as f64 / total as f64 };
        EvaluationStats {
            total_queries: total,
            evaluated_queries: evaluated,
            skipped_queries: self.ctx.counters.skipped.load(Ordering::Relaxed),
            evaluation_errors: self.ctx.counters.errors.load(Ordering::Relaxed),
            evaluation_rate: rate,
            recent_avg_scores: self.ctx.store.avg_scores(),
        }
    }

    /// The most recent evaluation records, newest first, at most `limit`.
    pub fn get_recent_results(&self, limit: usize) -> Vec<EvaluationRecord> {
        self.ctx.store.recent(limit)
    }

    /// Shut down the background tasks.
    ///
    /// Signals the batch loop to flush any remaining queued samples, closes
    /// the worker channel so it drains outstanding samples, and awaits both.
    /// Safe to call once; later `record_query` calls in worker modes count as
    /// skipped.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        self.sample_tx.lock().unwrap_or_else(PoisonError::into_inner).take();

        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "evaluation task terminated abnormally");
            }
        }
        info!("runtime evaluator stopped");
    }
}

async fn run_single(ctx: &EvalContext, sample: EvaluationSample) {
    let run_id = Uuid::new_v4();
    match ctx.evaluator.evaluate(std::slice::from_ref(&sample), &ctx.metrics).await {
        Ok(result) => {
            ctx.counters.evaluated.fetch_add(1, Ordering::Relaxed);
            let record = EvaluationRecord::Single {
                timestamp: Utc::now(),
                query_id: sample.query_id.clone(),
                scores: result.scores,
            };
            store_record(ctx, record, run_id).await;
        }
        Err(e) => {
            ctx.counters.errors.fetch_add(1, Ordering::Relaxed);
            error!(run_id = %run_id, query_id = %sample.query_id, error = %e, "evaluation failed");
        }
    }
}

async fn run_batch(ctx: &EvalContext, samples: Vec<EvaluationSample>) {
    let run_id = Uuid::new_v4();
    let sample_count = samples.len();
    match ctx.evaluator.evaluate(&samples, &ctx.metrics).await {
        Ok(result) => {
            ctx.counters.evaluated.fetch_add(sample_count as u64, Ordering::Relaxed);
            let record = EvaluationRecord::Batch {
                timestamp: Utc::now(),
                queries: samples.iter().map(|s| s.query_id.clone()).collect(),
                avg_scores: result.scores,
                sample_count,
            };
            store_record(ctx, record, run_id).await;
        }
        Err(e) => {
            ctx.counters.errors.fetch_add(sample_count as u64, Ordering::Relaxed);
            error!(run_id = %run_id, sample_count, error = %e, "batch evaluation failed");
        }
    }
}

async fn store_record(ctx: &EvalContext, record: EvaluationRecord, run_id: Uuid) {
    if let Err(e) = ctx.store.append(record).await {
        ctx.counters.errors.fetch_add(1, Ordering::Relaxed);
        error!(run_id = %run_id, error = %e, "failed to store evaluation result");
    } else {
        debug!(run_id = %run_id, "evaluation result stored");
    }
}

fn drain(pending: &Mutex<Vec<EvaluationSample>>) -> Vec<EvaluationSample> {
    std::mem::take(&mut *pending.lock().unwrap_or_else(PoisonError::into_inner))
}

fn spawn_batch_loop(
    ctx: EvalContext,
    pending: Arc<Mutex<Vec<EvaluationSample>>>,
    period: std::time::Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let batch = drain(&pending);
                    if !batch.is_empty() {
                        run_batch(&ctx, batch).await;
                    }
                }
                _ = shutdown_rx.changed() => {
                    let batch = drain(&pending);
                    if !batch.is_empty() {
                        debug!(sample_count = batch.len(), "final flush before shutdown");
                        run_batch(&ctx, batch).await;
                    }
                    break;
                }
            }
        }
    })
}

fn spawn_worker(
    ctx: EvalContext,
    mut sample_rx: mpsc::Receiver<EvaluationSample>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(sample) = sample_rx.recv().await {
            run_single(&ctx, sample).await;
        }
    })
}

/// Builder for constructing a [`RuntimeEvaluator`].
///
/// `config` is required; the evaluator defaults to the built-in
/// [`HeuristicEvaluator`].
#[derive(Default)]
pub struct RuntimeEvaluatorBuilder {
    config: Option<RuntimeEvaluationConfig>,
    evaluator: Option<Arc<dyn Evaluator>>,
}

impl RuntimeEvaluatorBuilder {
    /// Set the evaluation configuration.
    pub fn config(mut self, config: RuntimeEvaluationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the evaluation collaborator.
    pub fn evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Build the [`RuntimeEvaluator`] and spawn its background tasks.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ConfigError`] if no configuration was given.
    pub fn build(self) -> Result<RuntimeEvaluator> {
        let config = self
            .config
            .ok_or_else(|| EvalError::ConfigError("config is required".to_string()))?;
        let evaluator =
            self.evaluator.unwrap_or_else(|| Arc::new(HeuristicEvaluator::new()));

        let ctx = EvalContext {
            evaluator,
            store: Arc::new(ResultStore::new(config.max_results, config.results_path.clone())),
            counters: Arc::new(Counters::default()),
            metrics: config.metrics.clone(),
        };
        let pending = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut tasks = Vec::new();
        let mut sample_tx = None;
        match config.mode {
            EvaluationMode::Batch => {
                tasks.push(spawn_batch_loop(
                    ctx.clone(),
                    Arc::clone(&pending),
                    config.batch_interval,
                    shutdown_rx,
                ));
            }
            EvaluationMode::Sampling | EvaluationMode::AsyncAll => {
                let (tx, rx) = mpsc::channel(config.queue_capacity);
                sample_tx = Some(tx);
                tasks.push(spawn_worker(ctx.clone(), rx));
            }
            EvaluationMode::Disabled => {}
        }

        info!(mode = ?config.mode, "runtime evaluator started");
        Ok(RuntimeEvaluator {
            config,
            ctx,
            pending,
            sample_tx: Mutex::new(sample_tx),
            shutdown_tx,
            tasks: Mutex::new(tasks),
        })
    }
}
