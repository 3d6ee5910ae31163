use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{PersistenceSink, Result, StorageConfig, StorageError};
use crate::book::{Book, BookSource, Chapter};

/// Writes chapter text to one file per chapter
#[derive(Debug, Clone, Default)]
pub struct FileContentStore {
    config: StorageConfig,
}

impl FileContentStore {
    /// Create a new store with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new store with custom configuration
    pub fn with_config(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Path the text of `chapter` is stored at
    pub fn content_path(&self, chapter: &Chapter) -> Result<PathBuf> {
        Ok(self
            .config
            .book_dir(&chapter.book_url)?
            .join(format!("{:05}.txt", chapter.index)))
    }

    /// Whether the text of `chapter` has been stored
    pub async fn has_content(&self, chapter: &Chapter) -> Result<bool> {
        Ok(fs::try_exists(self.content_path(chapter)?).await?)
    }

    /// Load previously stored text of `chapter`
    pub async fn load_content(&self, chapter: &Chapter) -> Result<String> {
        let path = self.content_path(chapter)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound(format!(
                "No content stored for chapter {} of {}",
                chapter.index, chapter.book_url
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_directories(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceSink for FileContentStore {
    async fn save_content(
        &self,
        _source: &BookSource,
        book: &Book,
        chapter: &Chapter,
        content: &str,
    ) -> Result<()> {
        let path = self.content_path(chapter)?;
        self.ensure_directories(&path).await?;
        fs::write(&path, content).await?;
        debug!(
            book = %book.name,
            chapter = chapter.index,
            path = %path.display(),
            "stored chapter content"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::ChapterRuleSet;

    fn fixtures() -> (BookSource, Book, Chapter) {
        let source = BookSource::new("https://example.com", ChapterRuleSet::new("#c"));
        let book = Book::new("https://example.com/book/7", "Seven", "Someone");
        let chapter = Chapter::new(&book.url, 12, "https://example.com/book/7/12.html", "Twelve");
        (source, book, chapter)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileContentStore::with_config(StorageConfig::new(dir.path()));
        let (source, book, chapter) = fixtures();

        assert!(!store.has_content(&chapter).await.unwrap());
        store
            .save_content(&source, &book, &chapter, "\u{3000}\u{3000}Hello")
            .await
            .unwrap();

        assert!(store.has_content(&chapter).await.unwrap());
        assert_eq!(store.load_content(&chapter).await.unwrap(), "\u{3000}\u{3000}Hello");
        assert_eq!(
            store.content_path(&chapter).unwrap(),
            dir.path().join("example.com/book_7/00012.txt")
        );
    }

    #[tokio::test]
    async fn test_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileContentStore::with_config(StorageConfig::new(dir.path()));
        let (_, _, chapter) = fixtures();

        let result = store.load_content(&chapter).await;
        match result {
            Err(StorageError::NotFound(msg)) => assert!(msg.contains("12")),
            _ => panic!("Expected NotFound error"),
        }
    }
}
