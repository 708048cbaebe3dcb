//! Runtime evaluation for RAG backends.
//!
//! This crate provides:
//! - A [`RuntimeEvaluator`] that decides per query whether to evaluate
//!   (disabled / sampling / async-all / batch) without blocking the request
//!   path
//! - A background batch loop with size- and timer-triggered flushes
//! - The [`Evaluator`] collaborator trait and a built-in token-overlap
//!   [`HeuristicEvaluator`]
//! - Result storage: in-memory ring buffer plus JSON-lines persistence

mod config;
mod error;
mod evaluator;
mod runtime;
mod sample;
mod storage;

pub use config::{EvaluationMode, RuntimeEvaluationConfig, RuntimeEvaluationConfigBuilder};
pub use error::{EvalError, Result};
pub use evaluator::{Evaluator, HeuristicEvaluator};
pub use runtime::{EvaluationStats, RuntimeEvaluator, RuntimeEvaluatorBuilder};
pub use sample::{EvaluationRecord, EvaluationResult, EvaluationSample, MetricKind};
pub use storage::{ResultStore, read_records};
