//! Error types for the content module

use crate::error::Error as CrateError;
use crate::fetch::FetchError;
use crate::rule::RuleError;
use crate::store::StorageError;
use thiserror::Error;

/// Error type for chapter content operations
#[derive(Debug, Error)]
pub enum ContentError {
    /// A page request failed
    #[error("Fetch error: {0}")]
    Fetch(FetchError),

    /// A page came back without a body
    #[error("failed to fetch {url}")]
    MissingBody { url: String },

    /// The content rule could not be evaluated
    #[error("Content rule error: {0}")]
    ContentRule(#[source] RuleError),

    /// The replace rule could not be evaluated
    #[error("Replace rule error: {0}")]
    ReplaceRule(#[source] RuleError),

    /// The chapter assembled to blank text
    #[error("Chapter content is empty: {chapter}")]
    EmptyContent { chapter: String },

    /// The caller cancelled the chapter fetch
    #[error("Chapter fetch cancelled")]
    Cancelled,

    /// Content or catalog could not be saved
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Error during semaphore acquisition
    #[error("Semaphore acquisition error: {0}")]
    Semaphore(String),

    /// Error during task joining
    #[error("Task join error: {0}")]
    TaskJoin(String),
}

/// Broad class of a [`ContentError`], for callers deciding how to recover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network trouble; the same request may succeed later
    Fetch,
    /// A rule is broken; retrying will not help
    Rule,
    /// Rules matched nothing; the source likely needs fixing
    EmptyContent,
    Cancelled,
    Storage,
    Internal,
}

impl ContentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContentError::Fetch(_) | ContentError::MissingBody { .. } => ErrorKind::Fetch,
            ContentError::ContentRule(_) | ContentError::ReplaceRule(_) => ErrorKind::Rule,
            ContentError::EmptyContent { .. } => ErrorKind::EmptyContent,
            ContentError::Cancelled => ErrorKind::Cancelled,
            ContentError::Storage(_) => ErrorKind::Storage,
            ContentError::Semaphore(_) | ContentError::TaskJoin(_) => ErrorKind::Internal,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ContentError::Cancelled)
    }
}

impl From<FetchError> for ContentError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Cancelled => ContentError::Cancelled,
            other => ContentError::Fetch(other),
        }
    }
}

impl From<ContentError> for CrateError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Fetch(e) => e.into(),
            ContentError::MissingBody { .. } => CrateError::Fetch(err.to_string()),
            ContentError::ContentRule(e) | ContentError::ReplaceRule(e) => e.into(),
            ContentError::EmptyContent { chapter } => CrateError::EmptyContent(chapter),
            ContentError::Cancelled => CrateError::Cancelled,
            ContentError::Storage(e) => e.into(),
            _ => CrateError::Other(err.to_string()),
        }
    }
}

impl From<tokio::sync::AcquireError> for ContentError {
    fn from(err: tokio::sync::AcquireError) -> Self {
        Self::Semaphore(format!("Failed to acquire semaphore: {}", err))
    }
}

impl From<tokio::task::JoinError> for ContentError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(format!("Failed to join task: {}", err))
    }
}
