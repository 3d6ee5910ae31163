//! Chapter title resolution
//!
//! Title rules are best effort: a rule that fails or matches nothing leaves the
//! catalog title alone. A resolved title may carry an inline image marker,
//! `[title]<img src="...">`, in which case the image becomes the chapter's review
//! image and the text before it (if any) becomes the title.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::debug;

use crate::book::ChapterRuleSet;
use crate::debug_log::{DebugLog, Severity};
use crate::rule::{RuleContext, RuleEvaluator};

fn image_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r#"(?is)^\s*(.*?)\s*<img\s[^>]*?src\s*=\s*["']?([^"'\s>]+)["']?[^>]*>\s*$"#)
            .expect("image marker pattern is valid")
    })
}

/// Title and review image after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleResolution {
    pub title: String,
    pub review_image: Option<String>,
}

impl TitleResolution {
    fn unchanged(title: &str) -> Self {
        Self {
            title: title.to_string(),
            review_image: None,
        }
    }

    /// Whether this resolution differs from what the catalog currently holds
    pub fn changed(&self, title: &str, review_image: Option<&str>) -> bool {
        self.title != title
            || (self.review_image.is_some() && self.review_image.as_deref() != review_image)
    }
}

/// Resolves a chapter's title rule against its first page
#[derive(Clone)]
pub struct TitleResolver {
    evaluator: Arc<dyn RuleEvaluator>,
    debug_log: Arc<dyn DebugLog>,
    source_key: String,
}

impl TitleResolver {
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

    pub fn resolve_title(
        &self,
        rules: &ChapterRuleSet,
        context: &RuleContext<'_>,
        current_title: &str,
    ) -> TitleResolution {
        let Some(rule) = rules.title.as_deref().filter(|rule| !rule.trim().is_empty()) else {
            return TitleResolution::unchanged(current_title);
        };

        let resolved = match self.evaluator.resolve_string(rule, context) {
            Ok(resolved) => resolved,
            Err(err) => {
                self.debug_log.record(
                    &self.source_key,
                    &format!("title rule failed on {}: {}", context.base_url(), err),
                    Severity::Warn,
                );
                return TitleResolution::unchanged(current_title);
            }
        };
        let resolved = resolved.trim();
        if resolved.is_empty() {
            return TitleResolution::unchanged(current_title);
        }

        let resolution = match image_marker().captures(resolved) {
            Some(caps) => {
                let title = caps.get(1).map_or("", |m| m.as_str().trim());
                TitleResolution {
                    title: if title.is_empty() {
                        current_title.to_string()
                    } else {
                        title.to_string()
                    },
                    review_image: caps.get(2).map(|m| m.as_str().to_string()),
                }
            }
            None => TitleResolution {
                title: resolved.to_string(),
                review_image: None,
            },
        };
        debug!(title = %resolution.title, image = ?resolution.review_image, "resolved title");
        resolution
    }
}

impl std::fmt::Debug for TitleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TitleResolver")
            .field("source_key", &self.source_key)
            .finish()
    }
}
