use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::{de::from_str, se::to_string};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::{ChapterStore, Result, StorageConfig, StorageError};
use crate::book::Chapter;

const CATALOG_FILE: &str = "catalog.xml";

/// XML representation of a book's catalog
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename = "catalog")]
struct Catalog {
    #[serde(rename = "chapter", default)]
    chapters: Vec<CatalogEntry>,
}

/// XML representation of a single chapter
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub index: u32,

    pub url: String,

    pub title: String,

    #[serde(default)]
    pub is_volume: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_image: Option<String>,

    /// When the entry was last written
    pub updated_at: DateTime<Utc>,
}

impl From<&Chapter> for CatalogEntry {
    fn from(chapter: &Chapter) -> Self {
        CatalogEntry {
            index: chapter.index,
            url: chapter.url.clone(),
            title: chapter.title.clone(),
            is_volume: chapter.is_volume,
            review_image: chapter.review_image.clone(),
            updated_at: Utc::now(),
        }
    }
}

impl CatalogEntry {
    /// Rebuild the chapter this entry describes
    pub fn into_chapter(self, book_url: impl Into<String>) -> Chapter {
        Chapter {
            book_url: book_url.into(),
            index: self.index,
            url: self.url,
            title: self.title,
            is_volume: self.is_volume,
            review_image: self.review_image,
        }
    }
}

/// Chapter catalog stored as one XML file per book
#[derive(Debug, Default)]
pub struct XmlChapterStore {
    config: StorageConfig,

    /// Serializes read-modify-write cycles on catalog files
    write_lock: Mutex<()>,
}

impl XmlChapterStore {
    /// Create a new store with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new store with custom configuration
    pub fn with_config(config: StorageConfig) -> Self {
        Self {
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the catalog for the book at `book_url`
    pub fn catalog_path(&self, book_url: &str) -> Result<PathBuf> {
        Ok(self.config.book_dir(book_url)?.join(CATALOG_FILE))
    }

    /// Load every stored entry of a book's catalog, ordered by index
    pub async fn load_catalog(&self, book_url: &str) -> Result<Vec<CatalogEntry>> {
        let path = self.catalog_path(book_url)?;
        if !fs::try_exists(&path).await? {
            return Err(StorageError::NotFound(format!(
                "No catalog stored for {}",
                book_url
            )));
        }
        Ok(self.read(&path).await?.chapters)
    }

    async fn read(&self, path: &PathBuf) -> Result<Catalog> {
        match fs::read_to_string(path).await {
            Ok(xml) => Ok(from_str(&xml)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Catalog::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ChapterStore for XmlChapterStore {
    async fn update_chapter(&self, chapter: &Chapter) -> Result<()> {
        let path = self.catalog_path(&chapter.book_url)?;
        let _guard = self.write_lock.lock().await;

        let mut catalog = self.read(&path).await?;
        let entry = CatalogEntry::from(chapter);
        match catalog.chapters.iter_mut().find(|e| e.index == entry.index) {
            Some(existing) => *existing = entry,
            None => catalog.chapters.push(entry),
        }
        catalog.chapters.sort_by_key(|e| e.index);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let xml = to_string(&catalog)?;
        fs::write(
            &path,
            format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml),
        )
        .await?;
        debug!(chapter = chapter.index, title = %chapter.title, "updated catalog entry");
        Ok(())
    }
}
