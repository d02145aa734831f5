//! Error types for nbflow.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NbflowError>;

/// Errors produced by the analysis engine.
///
/// Per-cell parse and analysis failures are deliberately *not* represented
/// here: the program builder downgrades them to error cells and logs a
/// warning, so a single bad cell never poisons the execution log.
#[derive(Debug, Error)]
pub enum NbflowError {
    /// Source text could not be parsed into a module.
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Tree-sitter failed below the grammar level (language version, etc.).
    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),

    /// A library spec file is malformed.
    #[error("Spec error: {0}")]
    Spec(String),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// `take` was called on an empty set.
    #[error("cannot take from an empty set")]
    EmptySet,

    /// Invalid argument provided to a function.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
