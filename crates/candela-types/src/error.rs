//! Error types for candela.

use thiserror::Error;

/// Result type alias for candela operations.
pub type Result<T> = std::result::Result<T, CandelaError>;

/// Errors that can occur while aggregating or shuttling bar data.
#[derive(Error, Debug)]
pub enum CandelaError {
    /// Invalid input record.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Feed collaborator failure.
    #[error("Feed error: {0}")]
    Feed(String),

    /// Persistence collaborator failure.
    #[error("Store error: {0}")]
    Store(String),

    /// Output format error.
    #[error("Format error: {0}")]
    Format(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
