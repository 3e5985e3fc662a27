use crate::transform::TransformFamily;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by estimation, chaining and transform-log handling.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The requested transform family does not exist.
    #[error("invalid transform family: {0}")]
    InvalidTransformFamily(String),

    /// Fewer anchor points than the family requires.
    #[error("{family} needs {required} anchor point(s), got {provided}")]
    InsufficientAnchors {
        family: TransformFamily,
        required: usize,
        provided: usize,
    },

    /// The correspondence collaborator could not align two slices.
    #[error("correspondence failed between slice {source_index} and slice {target_index}: {reason}")]
    Correspondence {
        source_index: usize,
        target_index: usize,
        reason: String,
    },

    /// A transform log is missing, short or unreadable.
    #[error("malformed transform log at line {line}: {reason}")]
    MalformedLog { line: usize, reason: String },

    #[error("reference index {reference} out of range for {len} slice(s)")]
    InvalidReference { reference: usize, len: usize },

    #[error("slice sequence is empty")]
    EmptySequence,

    #[error("invalid color stack: {0}")]
    InvalidStack(String),

    #[error("slice {index} is {actual:?}, expected {expected:?}")]
    DimensionMismatch {
        index: usize,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("registration cancelled before slice {0}")]
    Cancelled(usize),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl RegistrationError {
    pub fn malformed_log(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedLog {
            line,
            reason: reason.into(),
        }
    }

    pub fn correspondence(
        source_index: usize,
        target_index: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::Correspondence {
            source_index,
            target_index,
            reason: reason.into(),
        }
    }
}

/// Numeric edge cases that are absorbed with a literal fallback value
/// instead of failing the computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericFallback {
    /// Near-zero color variance; BT.601 luma weights were used.
    NumericDegenerate,
    /// Eigenvector reduction lost precision; BT.709-derived constants were used.
    InsufficientPrecision,
}
