//! Error types for the reconciliation engine.

use thiserror::Error;

use crate::comparison::ComparisonKey;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, ReconError>;

/// Failures of the manual override workflow.
///
/// Every variant is detected before the registry is touched, so a returned
/// error always means the registry is unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverrideError {
    #[error("at least {min} comparisons must be selected, got {count}")]
    SelectionTooSmall { count: usize, min: usize },

    #[error("at most {max} comparisons can be matched at once, got {count}")]
    SelectionTooLarge { count: usize, max: usize },

    #[error("selection contains no processor transaction")]
    NoProcessorRecord,

    #[error("selection contains no billing transaction")]
    NoBillingRecord,

    #[error("record {id} appears more than once in the selection")]
    DuplicateRecordInSelection { id: String },

    /// Only pairs whose status is `Match` can be split again.
    #[error("comparison {key} is not a fully matched pair")]
    NotFullyMatchedForUnmatch { key: ComparisonKey },

    #[error("comparison {key} is not a paired comparison")]
    NotPaired { key: ComparisonKey },

    /// The registry no longer agrees with the selection (stale handle,
    /// record already owned by another comparison).
    #[error("override failed: {reason}")]
    OperationFailed { reason: String },
}

/// Errors that can occur while loading input or running the engine.
#[derive(Error, Debug)]
pub enum ReconError {
    /// Failed to open or read an input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Statistics serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse / deserialization error
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config value out of range
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// Invalid source record
    #[error("Invalid record at row {row}: {message}")]
    InvalidRecord { row: usize, message: String },
}
