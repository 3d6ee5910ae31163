use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::config::ContentConfig;
use super::ensure_active;
use super::error::ContentError;
use super::extractor::PageExtractor;
use super::normalizer::ContentNormalizer;
use super::pagination::PaginationOrchestrator;
use super::pool::FetchPool;
use super::title::{TitleResolution, TitleResolver};
use crate::book::{Book, BookSource, Chapter};
use crate::debug_log::{DebugLog, Severity, TracingDebugLog};
use crate::error::Error;
use crate::fetch::{FetchedPage, Fetcher};
use crate::rule::{CssRuleEvaluator, RuleContext, RuleEvaluator};
use crate::store::{ChapterStore, PersistenceSink};
use crate::urls::base_url;

/// Entry point for fetching and storing one chapter's content
///
/// A service is cheap to clone and safe to share between concurrent chapter
/// fetches. All of them draw continuation-page fetches from the same [`FetchPool`].
#[derive(Clone)]
pub struct ChapterContentService {
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn PersistenceSink>,
    chapter_store: Arc<dyn ChapterStore>,
    evaluator: Arc<dyn RuleEvaluator>,
    debug_log: Arc<dyn DebugLog>,
    pool: FetchPool,
}

impl ChapterContentService {
    pub fn builder() -> ChapterContentServiceBuilder {
        ChapterContentServiceBuilder::default()
    }

    /// Slots shared by this service's fan-out fetches
    pub fn pool(&self) -> &FetchPool {
        &self.pool
    }

    /// Assemble the chapter starting at `first_fetch` and optionally persist it
    ///
    /// `known_next_chapter_url` is the catalog URL of the following chapter, used to
    /// stop a page chain before it runs into that chapter. Returns the final text.
    #[instrument(
        skip_all,
        fields(source = %source.key, chapter = chapter.index, url = %first_fetch.final_url)
    )]
    #[allow(clippy::too_many_arguments)]
    pub async fn fetch_and_store_content(
        &self,
        source: &BookSource,
        book: &Book,
        chapter: &Chapter,
        first_fetch: FetchedPage,
        known_next_chapter_url: Option<&str>,
        persist: bool,
        cancel: &CancellationToken,
    ) -> Result<String, ContentError> {
        let body = first_fetch
            .body
            .as_deref()
            .ok_or_else(|| ContentError::MissingBody {
                url: first_fetch.requested_url.clone(),
            })?;
        let rules = Arc::new(source.content_rule.clone());
        let base = base_url(&first_fetch.final_url);

        let title = {
            let context = RuleContext::new(body, &base);
            TitleResolver::new(self.evaluator.clone(), self.debug_log.clone(), &source.key)
                .resolve_title(&rules, &context, &chapter.title)
        };

        let assembled = self
            .orchestrator(source)
            .assemble(&first_fetch, &rules, known_next_chapter_url, cancel)
            .await?;
        let content = ContentNormalizer::new(self.evaluator.clone()).normalize(
            &assembled,
            rules.replace_regex.as_deref(),
            &base,
        )?;

        if !chapter.is_volume && content.trim().is_empty() {
            self.debug_log.record(
                &source.key,
                &format!("chapter {} ({}) has no content", chapter.index, chapter.url),
                Severity::Warn,
            );
            return Err(ContentError::EmptyContent {
                chapter: chapter.title.clone(),
            });
        }
        ensure_active(cancel)?;

        if persist {
            self.persist(source, book, chapter, &title, &content).await?;
        }

        info!(
            pages = assembled.len(),
            chars = content.chars().count(),
            persisted = persist,
            "fetched chapter content"
        );
        Ok(content)
    }

    async fn persist(
        &self,
        source: &BookSource,
        book: &Book,
        chapter: &Chapter,
        title: &TitleResolution,
        content: &str,
    ) -> Result<(), ContentError> {
        let changed = title.changed(&chapter.title, chapter.review_image.as_deref());
        let mut updated = chapter.clone();
        if changed {
            updated.title = title.title.clone();
            if title.review_image.is_some() {
                updated.review_image = title.review_image.clone();
            }
        }

        self.sink.save_content(source, book, &updated, content).await?;
        if changed {
            self.chapter_store.update_chapter(&updated).await?;
        }
        Ok(())
    }

    fn orchestrator(&self, source: &BookSource) -> PaginationOrchestrator {
        let extractor =
            PageExtractor::new(self.evaluator.clone(), self.debug_log.clone(), &source.key);
        PaginationOrchestrator::new(
            self.fetcher.clone(),
            extractor,
            self.pool.clone(),
            self.debug_log.clone(),
            &source.key,
            source.headers.clone(),
        )
    }
}

impl std::fmt::Debug for ChapterContentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChapterContentService")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

/// Builder for ChapterContentService
#[derive(Default)]
pub struct ChapterContentServiceBuilder {
    fetcher: Option<Arc<dyn Fetcher>>,
    sink: Option<Arc<dyn PersistenceSink>>,
    chapter_store: Option<Arc<dyn ChapterStore>>,
    evaluator: Option<Arc<dyn RuleEvaluator>>,
    debug_log: Option<Arc<dyn DebugLog>>,
    config: ContentConfig,
    pool: Option<FetchPool>,
}

impl ChapterContentServiceBuilder {
    /// Set the fetcher used for continuation pages
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Set where final chapter text is written
    pub fn sink(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Set the catalog receiving title updates
    pub fn chapter_store(mut self, chapter_store: Arc<dyn ChapterStore>) -> Self {
        self.chapter_store = Some(chapter_store);
        self
    }

    /// Replace the default [`CssRuleEvaluator`]
    pub fn evaluator(mut self, evaluator: Arc<dyn RuleEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Replace the default [`TracingDebugLog`]
    pub fn debug_log(mut self, debug_log: Arc<dyn DebugLog>) -> Self {
        self.debug_log = Some(debug_log);
        self
    }

    pub fn config(mut self, config: ContentConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing pool instead of creating one from the config
    pub fn pool(mut self, pool: FetchPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn build(self) -> Result<ChapterContentService, Error> {
        let fetcher = self
            .fetcher
            .ok_or_else(|| Error::Other("ChapterContentService requires a fetcher".to_string()))?;
        let sink = self
            .sink
            .ok_or_else(|| {
                Error::Other("ChapterContentService requires a content sink".to_string())
            })?;
        let chapter_store = self.chapter_store.ok_or_else(|| {
            Error::Other("ChapterContentService requires a chapter store".to_string())
        })?;

        let pool = match self.pool {
            Some(pool) => {
                if pool.size() != self.config.concurrency {
                    warn!(
                        pool = pool.size(),
                        configured = self.config.concurrency,
                        "shared fetch pool overrides configured concurrency"
                    );
                }
                pool
            }
            None => FetchPool::new(self.config.concurrency),
        };

        Ok(ChapterContentService {
            fetcher,
            sink,
            chapter_store,
            evaluator: self
                .evaluator
                .unwrap_or_else(|| Arc::new(CssRuleEvaluator::new())),
            debug_log: self.debug_log.unwrap_or_else(|| Arc::new(TracingDebugLog)),
            pool,
        })
    }
}
