//! Error types for the model exporter

use thiserror::Error;

/// Errors returned while encoding or decoding model tables.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Parallel input arrays disagree in length or width
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Argmax landed outside the supplied class names
    #[error("class index {index} out of range for {len} class names (node {node})")]
    ClassIndex { node: usize, index: usize, len: usize },

    /// Tree links do not describe a binary tree over the node array
    #[error("invalid tree: {0}")]
    InvalidTree(String),

    /// Header row of a table does not match the expected schema
    #[error("unexpected header: expected [{expected}], found [{found}]")]
    Header { expected: String, found: String },

    /// A field could not be decoded
    #[error("parse error at row {row}, column {column}: {message}")]
    Parse {
        row: usize,
        column: String,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for export operations
pub type Result<T> = std::result::Result<T, ExportError>;
