//! Test doubles shared by the unit tests
//!
//! `MockFetcher` serves canned pages with optional delays and records the order in
//! which requests start and finish; the recording sink and store capture what the
//! content service tried to persist.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::book::{Book, BookSource, Chapter, ChapterRuleSet};
use crate::fetch::{FetchError, FetchTarget, FetchedPage, Fetcher};
use crate::store::{ChapterStore, PersistenceSink, StorageError};

/// Rules matching pages built by [`chapter_page`]
pub(crate) fn page_rules() -> ChapterRuleSet {
    ChapterRuleSet::new("#content@html").with_next_content_url("a.next@href")
}

/// A chapter page with one paragraph and a `next` link per entry of `next`
pub(crate) fn chapter_page(text: &str, next: &[&str]) -> String {
    let links = next
        .iter()
        .map(|href| format!(r#"<a class="next" href="{href}">next</a>"#))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "<html><body><h1>Heading</h1><div id=\"content\"><p>{text}</p></div>{links}</body></html>"
    )
}

#[derive(Debug, Clone, Default)]
struct MockPage {
    final_url: Option<String>,
    body: Option<String>,
    delay: Duration,
    fail: bool,
}

#[derive(Debug, Default)]
pub(crate) struct MockFetcher {
    pages: HashMap<String, MockPage>,
    requests: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    completions: Option<mpsc::UnboundedSender<String>>,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(self, url: &str, body: impl Into<String>) -> Self {
        self.delayed_page(url, body, Duration::ZERO)
    }

    pub(crate) fn delayed_page(
        mut self,
        url: &str,
        body: impl Into<String>,
        delay: Duration,
    ) -> Self {
        self.pages.insert(
            url.to_string(),
            MockPage {
                body: Some(body.into()),
                delay,
                ..Default::default()
            },
        );
        self
    }

    pub(crate) fn redirected_page(
        mut self,
        url: &str,
        final_url: &str,
        body: impl Into<String>,
    ) -> Self {
        self.pages.insert(
            url.to_string(),
            MockPage {
                final_url: Some(final_url.to_string()),
                body: Some(body.into()),
                ..Default::default()
            },
        );
        self
    }

    pub(crate) fn empty_page(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), MockPage::default());
        self
    }

    pub(crate) fn failing_page(mut self, url: &str, delay: Duration) -> Self {
        self.pages.insert(
            url.to_string(),
            MockPage {
                delay,
                fail: true,
                ..Default::default()
            },
        );
        self
    }

    /// Report each finished fetch on the returned channel
    pub(crate) fn notify_completions(mut self) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.completions = Some(tx);
        (self, rx)
    }

    /// URLs in the order their fetches started
    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// URLs in the order their fetches finished
    pub(crate) fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    /// Highest number of fetches that were running at the same time
    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(
        &self,
        target: &FetchTarget,
        cancel: &CancellationToken,
    ) -> Result<FetchedPage, FetchError> {
        self.requests.lock().unwrap().push(target.url.clone());
        let page = self
            .pages
            .get(&target.url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: target.url.clone(),
                status: 404,
            })?;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        if !page.delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep(page.delay) => {}
            }
        }
        if page.fail {
            return Err(FetchError::Other(format!("connection reset: {}", target.url)));
        }

        self.completed.lock().unwrap().push(target.url.clone());
        if let Some(tx) = &self.completions {
            let _ = tx.send(target.url.clone());
        }
        Ok(FetchedPage::new(
            target.url.clone(),
            page.final_url.unwrap_or_else(|| target.url.clone()),
            page.body,
        ))
    }
}

/// Records every `save_content` call
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    saved: Mutex<Vec<(Chapter, String)>>,
}

impl RecordingSink {
    pub(crate) fn saved(&self) -> Vec<(Chapter, String)> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl PersistenceSink for RecordingSink {
    async fn save_content(
        &self,
        _source: &BookSource,
        _book: &Book,
        chapter: &Chapter,
        content: &str,
    ) -> Result<(), StorageError> {
        self.saved
            .lock()
            .unwrap()
            .push((chapter.clone(), content.to_string()));
        Ok(())
    }
}

/// Records every `update_chapter` call
#[derive(Debug, Default)]
pub(crate) struct RecordingChapterStore {
    updated: Mutex<Vec<Chapter>>,
}

impl RecordingChapterStore {
    pub(crate) fn updated(&self) -> Vec<Chapter> {
        self.updated.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChapterStore for RecordingChapterStore {
    async fn update_chapter(&self, chapter: &Chapter) -> Result<(), StorageError> {
        self.updated.lock().unwrap().push(chapter.clone());
        Ok(())
    }
}
