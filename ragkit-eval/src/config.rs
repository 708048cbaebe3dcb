//! Runtime evaluation configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::sample::MetricKind;

/// When queries are evaluated.
///
/// Fixed at construction; an evaluator never changes mode over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Never evaluate.
    Disabled,
    /// Evaluate a random fraction of queries, one sample at a time.
    Sampling,
    /// Evaluate every query, one sample at a time.
    AsyncAll,
    /// Queue every query and evaluate in periodic batches.
    Batch,
}

/// Configuration for the [`RuntimeEvaluator`](crate::runtime::RuntimeEvaluator).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeEvaluationConfig {
    /// Evaluation scheduling mode.
    pub mode: EvaluationMode,
    /// Fraction of queries evaluated in [`EvaluationMode::Sampling`].
    pub sampling_rate: f64,
    /// Metrics computed per evaluation.
    pub metrics: Vec<MetricKind>,
    /// Queue length that triggers an immediate batch flush.
    pub batch_size: usize,
    /// Period of the background batch loop.
    pub batch_interval: Duration,
    /// JSON-lines results file; `None` disables persistence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_path: Option<PathBuf>,
    /// In-memory result ring buffer capacity.
    pub max_results: usize,
    /// Capacity of the single-sample evaluation channel.
    pub queue_capacity: usize,
}

impl Default for RuntimeEvaluationConfig {
    fn default() -> Self {
        Self {
            mode: EvaluationMode::Disabled,
            sampling_rate: 0.1,
            metrics: MetricKind::all().to_vec(),
            batch_size: 10,
            batch_interval: Duration::from_secs(60),
            results_path: None,
            max_results: 100,
            queue_capacity: 256,
        }
    }
}

impl RuntimeEvaluationConfig {
    /// Create a new builder for constructing a [`RuntimeEvaluationConfig`].
    pub fn builder() -> RuntimeEvaluationConfigBuilder {
        RuntimeEvaluationConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RuntimeEvaluationConfig`].
#[derive(Debug, Clone, Default)]
pub struct RuntimeEvaluationConfigBuilder {
    config: RuntimeEvaluationConfig,
}

impl RuntimeEvaluationConfigBuilder {
    /// Set the evaluation mode.
    pub fn mode(mut self, mode: EvaluationMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the sampling rate.
    pub fn sampling_rate(mut self, rate: f64) -> Self {
        self.config.sampling_rate = rate;
        self
    }

    /// Set the metrics to compute.
    pub fn metrics(mut self, metrics: Vec<MetricKind>) -> Self {
        self.config.metrics = metrics;
        self
    }

    /// Set the size-trigger for batch flushes.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the batch loop period.
    pub fn batch_interval(mut self, interval: Duration) -> Self {
        self.config.batch_interval = interval;
        self
    }

    /// Enable JSON-lines persistence at the given path.
    pub fn results_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.results_path = Some(path.into());
        self
    }

    /// Set the in-memory result buffer capacity.
    pub fn max_results(mut self, max: usize) -> Self {
        self.config.max_results = max;
        self
    }

    /// Set the single-sample channel capacity.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Build the [`RuntimeEvaluationConfig`], validating that parameters are
    /// consistent. Invalid values are rejected here, never clamped.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ConfigError`] if:
    /// - `sampling_rate` is outside `[0, 1]`
    /// - `batch_size == 0`
    /// - `batch_interval` is zero while mode is [`EvaluationMode::Batch`]
    /// - `max_results == 0` or `queue_capacity == 0`
    pub fn build(self) -> Result<RuntimeEvaluationConfig> {
        let config = self.config;
        if !(0.0..=1.0).contains(&config.sampling_rate) {
            return Err(EvalError::ConfigError(format!(
                "sampling_rate ({}) must be within [0, 1]",
                config.sampling_rate
            )));
        }
        if config.batch_size == 0 {
            return Err(EvalError::ConfigError("batch_size must be greater than zero".to_string()));
        }
        if config.mode == EvaluationMode::Batch && config.batch_interval.is_zero() {
            return Err(EvalError::ConfigError(
                "batch_interval must be positive in batch mode".to_string(),
            ));
        }
        if config.max_results == 0 {
            return Err(EvalError::ConfigError("max_results must be greater than zero".to_string()));
        }
        if config.queue_capacity == 0 {
            return Err(EvalError::ConfigError(
                "queue_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }
}
