//! Error types for the evaluation crate.

use thiserror::Error;

/// Errors produced by evaluation scheduling, scoring, and storage.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The evaluation collaborator failed.
    #[error("evaluator error: {0}")]
    EvaluatorError(String),

    /// Result persistence failed.
    #[error("storage error: {0}")]
    StorageError(String),
}

/// Result type alias for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;
