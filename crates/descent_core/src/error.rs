//! Error taxonomy for the descent core.
//!
//! Every fallible operation returns one of these as a typed outcome. Nothing
//! in the core aborts the host.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to turn expression text into an evaluable function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("invalid syntax: {message}")]
    InvalidSyntax { message: String },
    #[error("unsupported function: {name}")]
    UnsupportedFunction { name: String },
}

impl CompileError {
    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        CompileError::InvalidSyntax {
            message: message.into(),
        }
    }
}

/// Failure to evaluate a compiled function at a point.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationError {
    #[error("result is not finite")]
    NonFinite,
    #[error("domain error: {message}")]
    DomainError { message: String },
}

impl EvaluationError {
    pub(crate) fn domain(message: impl Into<String>) -> Self {
        EvaluationError::DomainError {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SampleError {
    #[error("no valid starting point in the sampling region")]
    NoValidPoint,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} = {value} is out of range (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("step index {index} is out of range for a trajectory of length {len}")]
pub struct IndexError {
    pub index: usize,
    pub len: usize,
}

/// Umbrella error for session-level operations that can fail at any stage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DescentError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Sample(#[from] SampleError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("no expression has been compiled")]
    NoFunction,
    #[error("no run has been recorded")]
    NoRun,
}
