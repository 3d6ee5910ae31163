use std::cell::OnceCell;

use scraper::Html;
use url::Url;

/// A page body as seen by rule evaluation
///
/// The HTML document is parsed on first access and reused by every rule resolved
/// against the same context. Contexts are short-lived and stay on one thread.
pub struct RuleContext<'a> {
    content: &'a str,
    base_url: &'a Url,
    document: OnceCell<Html>,
}

impl<'a> RuleContext<'a> {
    pub fn new(content: &'a str, base_url: &'a Url) -> Self {
        Self {
            content,
            base_url,
            document: OnceCell::new(),
        }
    }

    /// Raw text of the page
    pub fn content(&self) -> &'a str {
        self.content
    }

    /// URL relative links on the page resolve against
    pub fn base_url(&self) -> &'a Url {
        self.base_url
    }

    /// Parsed HTML document
    pub fn document(&self) -> &Html {
        self.document
            .get_or_init(|| Html::parse_document(self.content))
    }
}

impl std::fmt::Debug for RuleContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleContext")
            .field("base_url", &self.base_url.as_str())
            .field("content_len", &self.content.len())
            .field("parsed", &self.document.get().is_some())
            .finish()
    }
}
