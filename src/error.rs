//! Error types for the anofox-changepoint library.

use thiserror::Error;

/// Result type alias for change point operations.
pub type Result<T> = std::result::Result<T, HunterError>;

/// Errors that can occur while building, analysing or extending a series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HunterError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Input does not have the required shape.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A per-metric or per-attribute sequence does not match the time axis.
    #[error("length mismatch for '{name}': expected {expected}, got {got}")]
    LengthMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    /// Timestamps are out of order or overlap existing ones.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// Reference to a metric the series does not have.
    #[error("unknown metric: {0}")]
    UnknownMetric(String),

    /// Reference to an attribute the series does not have.
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    /// Change point bookkeeping is inconsistent with the series.
    ///
    /// Indicates a bug rather than bad caller data.
    #[error("corrupted analysis state: {0}")]
    CorruptedState(String),

    /// Index out of bounds.
    #[error("index out of bounds: {index} (size: {size})")]
    IndexOutOfBounds { index: usize, size: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Report or JSON serialisation failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl HunterError {
    /// Whether the error signals a broken internal invariant instead of bad input.
    pub fn is_logic_error(&self) -> bool {
        matches!(self, HunterError::CorruptedState(_))
    }
}

impl From<serde_json::Error> for HunterError {
    fn from(err: serde_json::Error) -> Self {
        HunterError::Serialization(err.to_string())
    }
}
