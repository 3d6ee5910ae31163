//! # Chapter Storage Module
//!
//! Where assembled chapters go. The content service only knows the two traits
//! below; the filesystem implementations keep one directory per book:
//!
//! ```text
//! <base_path>/<host>/<book path>/00042.txt     chapter text, by catalog index
//! <base_path>/<host>/<book path>/catalog.xml   chapter titles and image references
//! ```

mod catalog;
mod error;
mod file;

pub use catalog::{CatalogEntry, XmlChapterStore};
pub use error::StorageError;
pub use file::FileContentStore;

use std::path::PathBuf;

use async_trait::async_trait;
use url::Url;

use crate::book::{Book, BookSource, Chapter};

type Result<T> = std::result::Result<T, StorageError>;

/// Receives the final text of a chapter
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn save_content(
        &self,
        source: &BookSource,
        book: &Book,
        chapter: &Chapter,
        content: &str,
    ) -> Result<()>;
}

/// Keeps chapter metadata in sync with what was learned while fetching
#[async_trait]
pub trait ChapterStore: Send + Sync {
    async fn update_chapter(&self, chapter: &Chapter) -> Result<()>;
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base path for storage
    pub base_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from(".folio/books"),
        }
    }
}

impl StorageConfig {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Directory holding everything stored for the book at `book_url`
    pub fn book_dir(&self, book_url: &str) -> Result<PathBuf> {
        let parsed = Url::parse(book_url)?;
        let host = parsed
            .host_str()
            .ok_or_else(|| StorageError::InvalidUrl(book_url.to_string()))?;

        let mut name = sanitize(parsed.path());
        if let Some(query) = parsed.query() {
            name.push('_');
            name.push_str(&sanitize(query));
        }
        let name = name.trim_matches('_');
        let name = if name.is_empty() { "index" } else { name };

        Ok(self.base_path.join(host).join(name))
    }
}

/// Replace anything but alphanumerics with underscores
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}
