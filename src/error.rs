//! Error types for the search engine

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, NnsError>;

/// Error types that can occur while building or querying an index
#[derive(Error, Debug)]
pub enum NnsError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty dataset: {operation} requires at least one vector")]
    EmptyDataset { operation: &'static str },

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Index not built: call build or insert before searching")]
    IndexNotBuilt,

    #[error("{kind} index does not support incremental insertion; rebuild instead")]
    InsertUnsupported { kind: &'static str },

    #[error("Parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl NnsError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        NnsError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
