//! # Chapter Content Module
//!
//! Turns a chapter's first fetched page into its final, stored text.
//!
//! ## Key Components
//!
//! - `ChapterContentService`: the entry point; wires the stages below together,
//!   rejects blank chapters and hands the result to the configured sink
//! - `PageExtractor`: text and continuation links of a single page
//! - `PaginationOrchestrator`: follows a chain of pages one at a time, or fetches a
//!   listed set of pages in parallel through the shared `FetchPool`
//! - `TitleResolver`: optional title override, including the review image marker
//! - `ContentNormalizer`: joins pages and applies the source's replace rule
//!
//! ## Cancellation
//!
//! Every operation takes a `CancellationToken`. It is checked before each fetch and
//! before each page is appended; a cancelled fan-out aborts its outstanding fetches.
//! A cancelled chapter is never persisted.

mod config;
mod error;
mod extractor;
pub mod html;
mod normalizer;
mod pagination;
mod pool;
mod service;
mod title;

pub use config::{ContentConfig, ContentConfigBuilder, DEFAULT_CONCURRENCY};
pub use error::{ContentError, ErrorKind};
pub use extractor::{PageExtractor, PageResult};
pub use normalizer::ContentNormalizer;
pub use pagination::{AssembledContent, PaginationOrchestrator, VisitedSet};
pub use pool::FetchPool;
pub use service::{ChapterContentService, ChapterContentServiceBuilder};
pub use title::{TitleResolution, TitleResolver};

use tokio_util::sync::CancellationToken;

fn ensure_active(cancel: &CancellationToken) -> Result<(), ContentError> {
    if cancel.is_cancelled() {
        Err(ContentError::Cancelled)
    } else {
        Ok(())
    }
}
