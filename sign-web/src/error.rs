//! Error types
//!
//! Only configuration problems are fatal. Per-frame and per-window failures
//! are absorbed inside the pipeline and never surface past it.

use thiserror::Error;

/// Result alias for fallible construction
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Startup errors: the model, its tables and the tuning do not fit together
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Label table does not match the classifier output width
    #[error("label table has {labels} entries but classifier outputs {outputs} classes")]
    LabelCountMismatch { labels: usize, outputs: usize },

    /// Label table is empty or unreadable
    #[error("invalid label table: {0}")]
    InvalidLabels(String),

    /// mean/std table with the wrong length
    #[error("normalization table `{table}` has length {actual}, expected {expected}")]
    StatsLength {
        table: &'static str,
        expected: usize,
        actual: usize,
    },

    /// mean/std table containing NaN, infinity or negative deviations
    #[error("normalization table `{table}` has an invalid value at index {index}")]
    StatsValue { table: &'static str, index: usize },

    /// Threshold or length out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// JSON parse failure
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        ConfigError::Invalid(msg.into())
    }

    pub fn labels<S: Into<String>>(msg: S) -> Self {
        ConfigError::InvalidLabels(msg.into())
    }
}

/// A single classifier invocation failed. The ensemble skips the window.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// Backend raised an error
    #[error("classifier backend failed: {0}")]
    Backend(String),

    /// Output vector width differs from the label table
    #[error("classifier returned {actual} scores, expected {expected}")]
    OutputWidth { expected: usize, actual: usize },

    /// Output contained NaN or infinity
    #[error("classifier returned a non-finite score at index {0}")]
    NonFinite(usize),
}

impl ClassifierError {
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        ClassifierError::Backend(msg.into())
    }
}
