//! CSS selector and regex backed rule evaluator

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use regex::Regex;
use scraper::{ElementRef, Selector};
use tracing::trace;

use super::{RuleContext, RuleError, RuleEvaluator};
use crate::urls::absolute_url;

/// Default [`RuleEvaluator`], see the module docs for the rule syntax
///
/// Each distinct rule string is compiled once and cached for the lifetime of the
/// evaluator, so one instance should be shared per source configuration.
#[derive(Default)]
pub struct CssRuleEvaluator {
    cache: Mutex<HashMap<String, Arc<CompiledRule>>>,
}

impl CssRuleEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of compiled rules currently cached
    pub fn cached_rules(&self) -> usize {
        self.lock_cache().len()
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<String, Arc<CompiledRule>>> {
        match self.cache.lock() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn compile(&self, rule: &str) -> Result<Arc<CompiledRule>, RuleError> {
        if let Some(compiled) = self.lock_cache().get(rule) {
            return Ok(compiled.clone());
        }
        let compiled = Arc::new(CompiledRule::parse(rule)?);
        trace!(rule, alternatives = compiled.alternatives.len(), "compiled rule");
        self.lock_cache().insert(rule.to_string(), compiled.clone());
        Ok(compiled)
    }
}

impl std::fmt::Debug for CssRuleEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CssRuleEvaluator")
            .field("cached_rules", &self.cached_rules())
            .finish()
    }
}

impl RuleEvaluator for CssRuleEvaluator {
    fn resolve_string(&self, rule: &str, context: &RuleContext<'_>) -> Result<String, RuleError> {
        let compiled = self.compile(rule)?;
        for step in &compiled.alternatives {
            let joined = step
                .values(context)
                .into_iter()
                .filter(|value| !value.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            let value = step.rewrite(joined);
            if !value.trim().is_empty() {
                return Ok(value);
            }
        }
        Ok(String::new())
    }

    fn resolve_string_list(
        &self,
        rule: &str,
        context: &RuleContext<'_>,
        is_url: bool,
    ) -> Result<Vec<String>, RuleError> {
        let compiled = self.compile(rule)?;
        for step in &compiled.alternatives {
            let values = step
                .values(context)
                .into_iter()
                .map(|value| step.rewrite(value).trim().to_string())
                .filter(|value| !value.is_empty())
                .map(|value| {
                    if is_url {
                        absolute_url(context.base_url(), &value)
                    } else {
                        value
                    }
                })
                .collect::<Vec<_>>();
            if !values.is_empty() {
                return Ok(values);
            }
        }
        Ok(Vec::new())
    }
}

struct CompiledRule {
    alternatives: Vec<RuleStep>,
}

impl CompiledRule {
    fn parse(rule: &str) -> Result<Self, RuleError> {
        if rule.trim().is_empty() {
            return Err(RuleError::Syntax(rule.to_string()));
        }
        let alternatives = rule
            .split("||")
            .map(RuleStep::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { alternatives })
    }
}

enum Target {
    /// The context text itself
    Raw,
    /// The document root element
    Root(Extract),
    Select(Selector, Extract),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Extract {
    Text,
    OwnText,
    Html,
    OuterHtml,
    Attr(String),
}

impl Extract {
    fn parse(name: &str) -> Self {
        match name.trim() {
            "" | "text" => Extract::Text,
            "ownText" => Extract::OwnText,
            "html" => Extract::Html,
            "outerHtml" | "all" => Extract::OuterHtml,
            attr => Extract::Attr(attr.to_string()),
        }
    }

    fn apply(&self, element: ElementRef<'_>) -> String {
        match self {
            Extract::Text => element.text().collect::<String>().trim().to_string(),
            Extract::OwnText => element
                .children()
                .filter_map(|child| child.value().as_text().map(|text| text.trim().to_string()))
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
            Extract::Html => element.inner_html(),
            Extract::OuterHtml => element.html(),
            Extract::Attr(name) => element.value().attr(name).unwrap_or_default().to_string(),
        }
    }
}

struct Rewrite {
    regex: Regex,
    replacement: String,
}

struct RuleStep {
    target: Target,
    rewrite: Option<Rewrite>,
}

impl RuleStep {
    fn parse(alternative: &str) -> Result<Self, RuleError> {
        let (head, rewrite) = match alternative.find("##") {
            Some(pos) => {
                let tail = &alternative[pos + 2..];
                let (pattern, replacement) = match tail.find("##") {
                    Some(split) => (&tail[..split], &tail[split + 2..]),
                    None => (tail, ""),
                };
                let regex = Regex::new(pattern).map_err(|source| RuleError::Regex {
                    pattern: pattern.to_string(),
                    source,
                })?;
                let rewrite = Rewrite {
                    regex,
                    replacement: replacement.to_string(),
                };
                (&alternative[..pos], Some(rewrite))
            }
            None => (alternative, None),
        };

        let (selector, extract) = split_extractor(head.trim());
        let target = match (selector.trim(), extract) {
            ("", None) => Target::Raw,
            ("", Some(extract)) => Target::Root(Extract::parse(extract)),
            (selector, extract) => {
                let parsed = Selector::parse(selector).map_err(|e| RuleError::Selector {
                    selector: selector.to_string(),
                    message: e.to_string(),
                })?;
                Target::Select(parsed, Extract::parse(extract.unwrap_or_default()))
            }
        };

        Ok(Self { target, rewrite })
    }

    fn values(&self, context: &RuleContext<'_>) -> Vec<String> {
        match &self.target {
            Target::Raw => vec![context.content().to_string()],
            Target::Root(extract) => vec![extract.apply(context.document().root_element())],
            Target::Select(selector, extract) => context
                .document()
                .select(selector)
                .map(|element| extract.apply(element))
                .collect(),
        }
    }

    fn rewrite(&self, value: String) -> String {
        match &self.rewrite {
            Some(rewrite) => rewrite
                .regex
                .replace_all(&value, rewrite.replacement.as_str())
                .into_owned(),
            None => value,
        }
    }
}

/// Split `selector@extractor`, ignoring any `@` inside an attribute selector
fn split_extractor(head: &str) -> (&str, Option<&str>) {
    let search_from = head.rfind(']').map(|pos| pos + 1).unwrap_or(0);
    match head[search_from..].rfind('@') {
        Some(pos) => {
            let at = search_from + pos;
            (&head[..at], Some(&head[at + 1..]))
        }
        None => (head, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    const PAGE: &str = r#"
        <html><head><title>Chapter 1</title></head><body>
          <h1 class="title">Chapter 1 <small>(1/2)</small></h1>
          <div id="content"><p>First &amp; foremost.</p><p>Second.</p></div>
          <div class="pages">
            <a href="1_2.html">2</a>
            <a href="/book/1_3.html">3</a>
            <a href="mailto:x@example.com">mail</a>
          </div>
          <a class="next" data-href="2.html">next</a>
        </body></html>
    "#;

    fn base() -> Url {
        Url::parse("https://example.com/book/1.html").unwrap()
    }

    #[test]
    fn test_text_and_html_extractors() {
        let base = base();
        let ctx = RuleContext::new(PAGE, &base);
        let evaluator = CssRuleEvaluator::new();

        assert_eq!(evaluator.resolve_string("h1.title", &ctx).unwrap(), "Chapter 1 (1/2)");
        assert_eq!(evaluator.resolve_string("h1.title@ownText", &ctx).unwrap(), "Chapter 1");
        let html = evaluator.resolve_string("#content@html", &ctx).unwrap();
        assert!(html.contains("<p>First &amp; foremost.</p>"));
    }

    #[test]
    fn test_url_list_is_absolute() {
        let base = base();
        let ctx = RuleContext::new(PAGE, &base);
        let evaluator = CssRuleEvaluator::new();

        let urls = evaluator
            .resolve_string_list(".pages a[href$=html]@href", &ctx, true)
            .unwrap();
        assert_eq!(
            urls,
            vec![
                "https://example.com/book/1_2.html".to_string(),
                "https://example.com/book/1_3.html".to_string(),
            ]
        );
    }

    #[test]
    fn test_at_sign_inside_attribute_selector() {
        let base = base();
        let ctx = RuleContext::new(PAGE, &base);
        let evaluator = CssRuleEvaluator::new();

        let urls = evaluator
            .resolve_string_list("a[href*='@']@href", &ctx, false)
            .unwrap();
        assert_eq!(urls, vec!["mailto:x@example.com".to_string()]);
    }

    #[test]
    fn test_alternatives_fall_through() {
        let base = base();
        let ctx = RuleContext::new(PAGE, &base);
        let evaluator = CssRuleEvaluator::new();

        let next = evaluator
            .resolve_string_list("a.next@href||a.next@data-href", &ctx, true)
            .unwrap();
        assert_eq!(next, vec!["https://example.com/book/2.html".to_string()]);

        let missing = evaluator.resolve_string_list("a.prev@href", &ctx, true).unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_regex_rewrite_on_raw_text() {
        let base = base();
        let ctx = RuleContext::new("read at example.com\nline two", &base);
        let evaluator = CssRuleEvaluator::new();

        let rewritten = evaluator
            .resolve_string("##read at \\S+##(removed)", &ctx)
            .unwrap();
        assert_eq!(rewritten, "(removed)\nline two");

        let stripped = evaluator.resolve_string("##\\(1/2\\)", &RuleContext::new("A (1/2)", &base));
        assert_eq!(stripped.unwrap(), "A ");
    }

    #[test]
    fn test_selector_with_rewrite() {
        let base = base();
        let ctx = RuleContext::new(PAGE, &base);
        let evaluator = CssRuleEvaluator::new();

        let title = evaluator
            .resolve_string("h1.title@text##\\s*\\(\\d+/\\d+\\)", &ctx)
            .unwrap();
        assert_eq!(title, "Chapter 1");
    }

    #[test]
    fn test_invalid_rules() {
        let base = base();
        let ctx = RuleContext::new(PAGE, &base);
        let evaluator = CssRuleEvaluator::new();

        assert!(matches!(
            evaluator.resolve_string("div[", &ctx),
            Err(RuleError::Selector { .. })
        ));
        assert!(matches!(
            evaluator.resolve_string("##(unclosed", &ctx),
            Err(RuleError::Regex { .. })
        ));
        assert!(matches!(
            evaluator.resolve_string("  ", &ctx),
            Err(RuleError::Syntax(_))
        ));
    }

    #[test]
    fn test_rules_are_compiled_once() {
        let base = base();
        let ctx = RuleContext::new(PAGE, &base);
        let evaluator = CssRuleEvaluator::new();

        for _ in 0..3 {
            evaluator.resolve_string("h1.title", &ctx).unwrap();
        }
        evaluator.resolve_string("#content", &ctx).unwrap();
        assert_eq!(evaluator.cached_rules(), 2);
    }
}
