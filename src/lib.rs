//! # folio - Rule-driven chapter content assembly
//!
//! This crate turns a book source's content rules plus one fetched page into the
//! final text of a chapter. Chapters that span several pages on the source site are
//! followed either one link at a time or fetched all at once, depending on what the
//! first page reveals.
//!
//! ## Features
//!
//! - Sequential pagination with cycle and chapter-boundary detection
//! - Parallel fan-out over a process-wide, bounded fetch pool with
//!   order-preserving aggregation
//! - CSS/regex rule evaluation with fallbacks
//! - Title overrides, including an embedded review-image marker
//! - Global replace rules and paragraph re-indentation
//! - Explicit cancellation threaded through every fetch
//! - Pluggable fetcher, content sink and chapter catalog, with reqwest and
//!   filesystem implementations included
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use folio::book::{Book, BookSource, Chapter, ChapterRuleSet};
//! use folio::content::{ChapterContentService, ContentConfig};
//! use folio::fetch::{FetchConfig, FetchTarget, Fetcher, HttpFetcher};
//! use folio::store::{FileContentStore, StorageConfig, XmlChapterStore};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = Arc::new(HttpFetcher::new(FetchConfig::default())?);
//!     let storage = StorageConfig::default();
//!     let service = ChapterContentService::builder()
//!         .fetcher(fetcher.clone())
//!         .sink(Arc::new(FileContentStore::with_config(storage.clone())))
//!         .chapter_store(Arc::new(XmlChapterStore::with_config(storage)))
//!         .config(ContentConfig::default())
//!         .build()?;
//!
//!     let source = BookSource::new(
//!         "https://novels.example.com",
//!         ChapterRuleSet::new("#content@html").with_next_content_url("a.next@href"),
//!     );
//!     let book = Book::new("https://novels.example.com/book/1", "A Book", "Someone");
//!     let chapter = Chapter::new(&book.url, 0, "https://novels.example.com/book/1/1.html", "One");
//!
//!     let cancel = CancellationToken::new();
//!     let first = fetcher
//!         .fetch(&FetchTarget::new(&chapter.url).with_headers(source.headers.clone()), &cancel)
//!         .await?;
//!     let text = service
//!         .fetch_and_store_content(&source, &book, &chapter, first, None, true, &cancel)
//!         .await?;
//!     println!("{text}");
//!     Ok(())
//! }
//! ```

mod error;

pub mod book;
pub mod content;
pub mod debug_log;
pub mod fetch;
pub mod rule;
pub mod store;
pub mod urls;

#[cfg(test)]
pub(crate) mod testing;

pub use error::Error;

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::book::{Book, BookSource, Chapter, ChapterRuleSet};
    pub use crate::content::{ChapterContentService, ContentConfig, ContentError};
    pub use crate::error::Error;
    pub use crate::error::Result;
}
