//! Error types for the folio crate

use thiserror::Error;

/// Result type for folio operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for folio operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network fetch failed or returned no body
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// A source rule could not be evaluated
    #[error("Rule error: {0}")]
    Rule(String),

    /// The assembled chapter text was blank
    #[error("Empty content: {0}")]
    EmptyContent(String),

    /// The operation was cancelled by its caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Content or catalog storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
