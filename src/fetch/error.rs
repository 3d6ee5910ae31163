//! Error types for the fetch module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for fetch operations
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("GET {url} returned {status}")]
    Status { url: String, status: u16 },

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Header name or value could not be sent
    #[error("Invalid header '{0}'")]
    InvalidHeader(String),

    /// The request was abandoned because its caller cancelled
    #[error("Request cancelled")]
    Cancelled,

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<FetchError> for CrateError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Http(e) => CrateError::Http(e),
            FetchError::Cancelled => CrateError::Cancelled,
            _ => CrateError::Fetch(err.to_string()),
        }
    }
}
