//! # Book and Source Model
//!
//! Plain data records shared by every stage of chapter assembly.
//!
//! - `BookSource`: a website configuration (request headers and content rules)
//! - `ChapterRuleSet`: the rule strings used to pull a chapter out of a page
//! - `Book` / `Chapter`: identity of the book being read and one of its chapters
//!
//! All records deserialize from the camelCase JSON that source definitions are
//! usually shared in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Rule strings used to extract one chapter from a source page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChapterRuleSet {
    /// Rule selecting the chapter body
    pub content: String,

    /// Rule selecting the chapter title, if the page carries a better one than the catalog
    pub title: Option<String>,

    /// Rule selecting the URLs of the chapter's continuation pages
    pub next_content_url: Option<String>,

    /// Replace rule run once over the whole assembled chapter
    pub replace_regex: Option<String>,
}

impl ChapterRuleSet {
    /// Create a rule set with only a content rule
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Set the title rule
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the next-page URL rule
    pub fn with_next_content_url(mut self, next_content_url: impl Into<String>) -> Self {
        self.next_content_url = Some(next_content_url.into());
        self
    }

    /// Set the global replace rule
    pub fn with_replace_regex(mut self, replace_regex: impl Into<String>) -> Self {
        self.replace_regex = Some(replace_regex.into());
        self
    }
}

/// A website that books are read from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookSource {
    /// Unique key of the source, usually its base URL
    pub key: String,

    /// Display name
    pub name: String,

    /// Headers sent with every request to this source
    pub headers: HashMap<String, String>,

    /// Rules for extracting chapter content
    pub content_rule: ChapterRuleSet,
}

impl BookSource {
    pub fn new(key: impl Into<String>, content_rule: ChapterRuleSet) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            headers: HashMap::new(),
            content_rule,
        }
    }

    /// Add a request header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A book on a source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Book {
    /// URL of the book's info page, used as its identifier
    pub url: String,

    pub name: String,

    pub author: String,

    /// Key of the source the book was found on
    pub origin: String,
}

impl Book {
    pub fn new(url: impl Into<String>, name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            author: author.into(),
            origin: String::new(),
        }
    }
}

/// One entry of a book's table of contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Chapter {
    /// URL of the book this chapter belongs to
    pub book_url: String,

    /// Position in the table of contents
    pub index: u32,

    /// URL of the chapter's first page
    pub url: String,

    pub title: String,

    /// Structural node (such as a "Part Two" heading) that has no text of its own
    pub is_volume: bool,

    /// Image reference carried by the chapter title, if any
    pub review_image: Option<String>,
}

impl Chapter {
    pub fn new(
        book_url: impl Into<String>,
        index: u32,
        url: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            book_url: book_url.into(),
            index,
            url: url.into(),
            title: title.into(),
            is_volume: false,
            review_image: None,
        }
    }

    /// Mark the chapter as a volume heading
    pub fn volume(mut self) -> Self {
        self.is_volume = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_json() {
        let json = r###"{
            "key": "https://novels.example.com",
            "name": "Example",
            "headers": {"Referer": "https://novels.example.com/"},
            "contentRule": {
                "content": "#content@html",
                "nextContentUrl": "a.next@href",
                "replaceRegex": "##ads##"
            }
        }"###;

        let source: BookSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.name, "Example");
        assert_eq!(source.headers["Referer"], "https://novels.example.com/");
        assert_eq!(source.content_rule.content, "#content@html");
        assert_eq!(source.content_rule.next_content_url.as_deref(), Some("a.next@href"));
        assert_eq!(source.content_rule.replace_regex.as_deref(), Some("##ads##"));
        assert!(source.content_rule.title.is_none());
    }

    #[test]
    fn test_chapter_builders() {
        let chapter = Chapter::new("https://b", 3, "https://b/3", "Part Two").volume();
        assert!(chapter.is_volume);
        assert_eq!(chapter.index, 3);
        assert!(chapter.review_image.is_none());
    }
}
