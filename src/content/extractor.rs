//! Single-page extraction: chapter text plus continuation links

use std::sync::Arc;

use tracing::{debug, warn};

use super::error::ContentError;
use super::html::format_keep_img;
use crate::book::ChapterRuleSet;
use crate::debug_log::{DebugLog, Severity};
use crate::rule::{RuleContext, RuleEvaluator};
use crate::urls::base_url;

/// Text and continuation links found on one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageResult {
    /// Formatted chapter text of the page
    pub text: String,

    /// Candidate URLs of the chapter's next page(s), absolute, in page order
    pub next_urls: Vec<String>,
}

/// Runs a source's content rules over one fetched page
#[derive(Clone)]
pub struct PageExtractor {
    evaluator: Arc<dyn RuleEvaluator>,
    debug_log: Arc<dyn DebugLog>,
    source_key: String,
}

impl PageExtractor {
    pub fn new(
        evaluator: Arc<dyn RuleEvaluator>,
        debug_log: Arc<dyn DebugLog>,
        source_key: impl Into<String>,
    ) -> Self {
        Self {
            evaluator,
            debug_log,
            source_key: source_key.into(),
        }
    }

    /// Extract from a raw body fetched from `page_url`
    pub fn extract(
        &self,
        body: &str,
        page_url: &str,
        rules: &ChapterRuleSet,
        get_next_urls: bool,
    ) -> Result<PageResult, ContentError> {
        let base = base_url(page_url);
        let context = RuleContext::new(body, &base);
        self.extract_in(&context, rules, get_next_urls)
    }

    /// Extract from an existing rule context
    ///
    /// A failing content rule is fatal. A failing next-page rule only loses the
    /// continuation links.
    pub fn extract_in(
        &self,
        context: &RuleContext<'_>,
        rules: &ChapterRuleSet,
        get_next_urls: bool,
    ) -> Result<PageResult, ContentError> {
        let raw = self
            .evaluator
            .resolve_string(&rules.content, context)
            .map_err(|err| {
                self.debug_log.record(
                    &self.source_key,
                    &format!("content rule failed on {}: {}", context.base_url(), err),
                    Severity::Error,
                );
                ContentError::ContentRule(err)
            })?;
        let text = format_keep_img(&raw, context.base_url());

        let next_rule = rules
            .next_content_url
            .as_deref()
            .filter(|rule| !rule.trim().is_empty());
        let next_urls = match next_rule {
            Some(rule) if get_next_urls => self.next_urls(rule, context),
            _ => Vec::new(),
        };

        debug!(
            url = %context.base_url(),
            chars = text.chars().count(),
            next = next_urls.len(),
            "extracted page"
        );
        Ok(PageResult { text, next_urls })
    }

    fn next_urls(&self, rule: &str, context: &RuleContext<'_>) -> Vec<String> {
        match self.evaluator.resolve_string_list(rule, context, true) {
            Ok(urls) => {
                if !urls.is_empty() {
                    self.debug_log.record(
                        &self.source_key,
                        &format!("next page links: {}", urls.join(", ")),
                        Severity::Debug,
                    );
                }
                urls
            }
            Err(err) => {
                warn!(url = %context.base_url(), %err, "next page rule failed");
                self.debug_log.record(
                    &self.source_key,
                    &format!("next page rule failed on {}: {}", context.base_url(), err),
                    Severity::Warn,
                );
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for PageExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageExtractor")
            .field("source_key", &self.source_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_log::MemoryDebugLog;
    use crate::rule::CssRuleEvaluator;

    const PAGE: &str = r#"<html><body>
        <div id="content"><p>It was a dark night.</p><p>Then &amp; now.</p><img src="pic.png"></div>
        <a class="next" href="1_2.html">next</a>
    </body></html>"#;

    fn extractor(log: Arc<MemoryDebugLog>) -> PageExtractor {
        PageExtractor::new(Arc::new(CssRuleEvaluator::new()), log, "test-source")
    }

    #[test]
    fn test_extract_text_and_next_url() {
        let log = Arc::new(MemoryDebugLog::default());
        let rules = ChapterRuleSet::new("#content@html").with_next_content_url("a.next@href");

        let page = extractor(log)
            .extract(PAGE, "https://example.com/b/1.html", &rules, true)
            .unwrap();

        assert_eq!(
            page.text,
            "\u{3000}\u{3000}It was a dark night.\n\u{3000}\u{3000}Then & now.\n\u{3000}\u{3000}<img src=\"https://example.com/b/pic.png\">"
        );
        assert_eq!(page.next_urls, vec!["https://example.com/b/1_2.html".to_string()]);
    }

    #[test]
    fn test_next_urls_skipped_when_not_requested() {
        let log = Arc::new(MemoryDebugLog::default());
        let rules = ChapterRuleSet::new("#content@html").with_next_content_url("a.next@href");

        let page = extractor(log)
            .extract(PAGE, "https://example.com/b/1.html", &rules, false)
            .unwrap();
        assert!(page.next_urls.is_empty());
    }

    #[test]
    fn test_broken_next_rule_is_not_fatal() {
        let log = Arc::new(MemoryDebugLog::default());
        let rules = ChapterRuleSet::new("#content@html").with_next_content_url("a[");

        let page = extractor(log.clone())
            .extract(PAGE, "https://example.com/b/1.html", &rules, true)
            .unwrap();
        assert!(page.next_urls.is_empty());
        assert!(!page.text.is_empty());
        assert!(log
            .records_for("test-source")
            .iter()
            .any(|r| r.severity == Severity::Warn));
    }

    #[test]
    fn test_broken_content_rule_is_fatal() {
        let log = Arc::new(MemoryDebugLog::default());
        let rules = ChapterRuleSet::new("#content[");

        let result = extractor(log).extract(PAGE, "https://example.com/b/1.html", &rules, true);
        assert!(matches!(result, Err(ContentError::ContentRule(_))));
    }

    #[test]
    fn test_attribute_values_do_not_leak_into_text() {
        let log = Arc::new(MemoryDebugLog::default());
        let rules = ChapterRuleSet::new("#content@html");
        let page = r#"<div id=content><p>Before</p><img alt="1 > 0" src="x.png"><p title="a>b">After</p></div>"#;

        let result = extractor(log)
            .extract(page, "https://example.com/b/1.html", &rules, false)
            .unwrap();
        assert_eq!(
            result.text,
            "\u{3000}\u{3000}Before\n\u{3000}\u{3000}<img src=\"https://example.com/b/x.png\">\n\u{3000}\u{3000}After"
        );
    }

    #[test]
    fn test_missing_content_is_empty_text() {
        let log = Arc::new(MemoryDebugLog::default());
        let rules = ChapterRuleSet::new("#nothing@html");

        let page = extractor(log)
            .extract(PAGE, "https://example.com/b/1.html", &rules, true)
            .unwrap();
        assert_eq!(page, PageResult::default());
    }
}
