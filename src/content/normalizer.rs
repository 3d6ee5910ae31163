use std::sync::Arc;

use tracing::debug;
use url::Url;

use super::error::ContentError;
use super::html::PARAGRAPH_INDENT;
use super::pagination::AssembledContent;
use crate::rule::{RuleContext, RuleEvaluator};

/// Joins assembled pages and applies a source's replace rule
#[derive(Clone)]
pub struct ContentNormalizer {
    evaluator: Arc<dyn RuleEvaluator>,
}

impl ContentNormalizer {
    pub fn new(evaluator: Arc<dyn RuleEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Produce the final chapter text
    ///
    /// Without a replace rule the pages are only joined. With one, lines are trimmed
    /// before the rule runs over the whole text and re-indented afterwards, so breaks
    /// the rule inserts are indented like the rest.
    pub fn normalize(
        &self,
        content: &AssembledContent,
        replace_rule: Option<&str>,
        base_url: &Url,
    ) -> Result<String, ContentError> {
        let joined = content.join();
        let Some(rule) = replace_rule.filter(|rule| !rule.trim().is_empty()) else {
            return Ok(joined);
        };

        let trimmed = joined.lines().map(str::trim).collect::<Vec<_>>().join("\n");
        let context = RuleContext::new(&trimmed, base_url);
        let replaced = self
            .evaluator
            .resolve_string(rule, &context)
            .map_err(ContentError::ReplaceRule)?;
        debug!(rule, before = trimmed.len(), after = replaced.len(), "applied replace rule");

        Ok(replaced
            .lines()
            .map(str::trim)
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("{PARAGRAPH_INDENT}{line}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

impl std::fmt::Debug for ContentNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentNormalizer").finish_non_exhaustive()
    }
}
