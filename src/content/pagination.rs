//! Multi-page chapter assembly
//!
//! A chapter's first page decides how the rest of it is fetched:
//!
//! - no continuation link: the chapter is that one page
//! - exactly one link: follow the chain page by page, since each page's successor is
//!   only known once the page has been parsed
//! - several links: the first page lists every remaining page, so fetch them all at
//!   once through the shared [`FetchPool`] and put the results back in list order

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, info, instrument, Instrument};

use super::ensure_active;
use super::error::ContentError;
use super::extractor::PageExtractor;
use super::pool::FetchPool;
use crate::book::ChapterRuleSet;
use crate::debug_log::{DebugLog, Severity};
use crate::fetch::{FetchTarget, FetchedPage, Fetcher};
use crate::urls::{absolute_url, base_url};

/// Page texts of one chapter, in reading order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledContent {
    pages: Vec<String>,
}

impl AssembledContent {
    pub fn new(first_page: String) -> Self {
        Self {
            pages: vec![first_page],
        }
    }

    pub fn push(&mut self, page: String) {
        self.pages.push(page);
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// All pages joined with line feeds
    pub fn join(&self) -> String {
        self.pages.join("\n")
    }
}

impl From<Vec<String>> for AssembledContent {
    fn from(pages: Vec<String>) -> Self {
        Self { pages }
    }
}

/// URLs already followed while walking one chapter's page chain
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    urls: HashSet<String>,
}

impl VisitedSet {
    /// Start a walk at `first_url`
    pub fn new(first_url: impl Into<String>) -> Self {
        let mut urls = HashSet::new();
        urls.insert(first_url.into());
        Self { urls }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Record `url`; returns `false` if it was already present
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        self.urls.insert(url.into())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Fetches the continuation pages of a chapter
#[derive(Clone)]
pub struct PaginationOrchestrator {
    fetcher: Arc<dyn Fetcher>,
    extractor: PageExtractor,
    pool: FetchPool,
    debug_log: Arc<dyn DebugLog>,
    source_key: String,
    headers: HashMap<String, String>,
}

impl PaginationOrchestrator {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: PageExtractor,
        pool: FetchPool,
        debug_log: Arc<dyn DebugLog>,
        source_key: impl Into<String>,
        headers: HashMap<String, String>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            pool,
            debug_log,
            source_key: source_key.into(),
            headers,
        }
    }

    /// Assemble every page of the chapter whose first page is `first_page`
    ///
    /// `known_next_chapter_url` marks where this chapter ends: a continuation link
    /// pointing at it is the next chapter, not another page of this one.
    #[instrument(skip_all, fields(url = %first_page.final_url))]
    pub async fn assemble(
        &self,
        first_page: &FetchedPage,
        rules: &Arc<ChapterRuleSet>,
        known_next_chapter_url: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<AssembledContent, ContentError> {
        let body = first_page
            .body
            .as_deref()
            .ok_or_else(|| ContentError::MissingBody {
                url: first_page.requested_url.clone(),
            })?;
        let first = self
            .extractor
            .extract(body, &first_page.final_url, rules, true)?;
        ensure_active(cancel)?;

        let mut assembled = AssembledContent::new(first.text);
        match first.next_urls.len() {
            0 => debug!("single page chapter"),
            1 => {
                self.follow_chain(
                    first_page,
                    first.next_urls,
                    rules,
                    known_next_chapter_url,
                    cancel,
                    &mut assembled,
                )
                .await?;
            }
            count => {
                self.record(&format!("fetching {count} continuation pages in parallel"));
                let pages = self.fan_out(first.next_urls, rules.clone(), cancel).await?;
                ensure_active(cancel)?;
                for page in pages {
                    assembled.push(page);
                }
            }
        }

        info!(pages = assembled.len(), "assembled chapter");
        Ok(assembled)
    }

    async fn follow_chain(
        &self,
        first_page: &FetchedPage,
        candidates: Vec<String>,
        rules: &ChapterRuleSet,
        known_next_chapter_url: Option<&str>,
        cancel: &CancellationToken,
        assembled: &mut AssembledContent,
    ) -> Result<(), ContentError> {
        let base = base_url(&first_page.final_url);
        let next_chapter = known_next_chapter_url
            .map(|url| absolute_url(&base, url))
            .filter(|url| !url.is_empty());
        let mut visited = VisitedSet::new(absolute_url(&base, &first_page.final_url));

        let mut next = candidates.into_iter().next();
        while let Some(candidate) = next.take() {
            let url = absolute_url(&base, &candidate);
            if url.is_empty() {
                break;
            }
            if visited.contains(&url) {
                debug!(%url, "next page already visited");
                break;
            }
            if next_chapter.as_deref() == Some(url.as_str()) {
                debug!(%url, "next page is the next chapter");
                break;
            }
            visited.insert(url.clone());

            ensure_active(cancel)?;
            let page = self.fetch(&url, cancel).await?;
            let body = page
                .body
                .as_deref()
                .ok_or_else(|| ContentError::MissingBody { url: url.clone() })?;
            let result = self.extractor.extract(body, &page.final_url, rules, true)?;
            ensure_active(cancel)?;
            assembled.push(result.text);

            // Only a single successor continues the chain.
            next = if result.next_urls.len() == 1 {
                result.next_urls.into_iter().next()
            } else {
                None
            };
        }
        Ok(())
    }

    async fn fetch(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchedPage, ContentError> {
        self.record(&format!("fetching next page {url}"));
        let target = FetchTarget::new(url).with_headers(self.headers.clone());
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ContentError::Cancelled),
            result = self.fetcher.fetch(&target, cancel) => Ok(result?),
        }
    }

    /// Fetch every URL concurrently, returning texts in `urls` order
    async fn fan_out(
        &self,
        urls: Vec<String>,
        rules: Arc<ChapterRuleSet>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ContentError> {
        let total = urls.len();
        let mut tasks = JoinSet::new();

        for (index, url) in urls.into_iter().enumerate() {
            let fetcher = self.fetcher.clone();
            let extractor = self.extractor.clone();
            let pool = self.pool.clone();
            let rules = rules.clone();
            let headers = self.headers.clone();
            let cancel = cancel.clone();

            tasks.spawn(
                async move {
                    let _permit = pool.acquire().await?;
                    let target = FetchTarget::new(&url).with_headers(headers);
                    let page = fetcher.fetch(&target, &cancel).await?;
                    let body = page
                        .body
                        .as_deref()
                        .ok_or_else(|| ContentError::MissingBody { url: url.clone() })?;
                    let result = extractor.extract(body, &page.final_url, &rules, false)?;
                    Ok::<_, ContentError>((index, result.text))
                }
                .instrument(debug_span!("fan_out_page", index)),
            );
        }

        let mut slots: Vec<Option<String>> = vec![None; total];
        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                joined = tasks.join_next() => Some(joined),
            };
            let Some(joined) = joined else {
                tasks.abort_all();
                return Err(ContentError::Cancelled);
            };
            match joined {
                None => break,
                Some(Ok(Ok((index, text)))) => slots[index] = Some(text),
                Some(Ok(Err(err))) => {
                    tasks.abort_all();
                    return Err(err);
                }
                Some(Err(err)) => {
                    tasks.abort_all();
                    return Err(err.into());
                }
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| ContentError::TaskJoin(format!("page {index} produced no text")))
            })
            .collect()
    }

    fn record(&self, message: &str) {
        self.debug_log
            .record(&self.source_key, message, Severity::Debug);
    }
}

impl std::fmt::Debug for PaginationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginationOrchestrator")
            .field("source_key", &self.source_key)
            .field("pool_size", &self.pool.size())
            .finish()
    }
}
