//! # Rule Evaluation Module
//!
//! Book sources describe where content lives on a page with short rule strings.
//! This module defines the [`RuleEvaluator`] seam the rest of the crate resolves
//! rules through, plus a CSS/regex implementation.
//!
//! ## Key Components
//!
//! - `RuleEvaluator`: resolves a rule against a [`RuleContext`] into a string or a list
//! - `RuleContext`: a page body and its base URL, parsed lazily on first use
//! - `CssRuleEvaluator`: the default evaluator, backed by `scraper` and `regex`
//!
//! ## Rule Syntax (`CssRuleEvaluator`)
//!
//! ```text
//! rule        := alternative ("||" alternative)*
//! alternative := [css-selector] ["@" extractor] ["##" regex ["##" replacement]]
//! extractor   := "text" | "ownText" | "html" | "outerHtml" | attribute-name
//! ```
//!
//! The first alternative with a non-empty result wins. An alternative with neither
//! selector nor extractor works on the raw context text, so `##foo##bar` rewrites
//! the text it is given.

mod context;
mod css;
mod error;

pub use context::RuleContext;
pub use css::CssRuleEvaluator;
pub use error::RuleError;

/// Resolves source rules against a page
///
/// Implementations are shared between concurrent chapter fetches and must be
/// cheap to call repeatedly with the same rule string.
pub trait RuleEvaluator: Send + Sync {
    /// Resolve `rule` to a single string
    fn resolve_string(&self, rule: &str, context: &RuleContext<'_>) -> Result<String, RuleError>;

    /// Resolve `rule` to a list of strings, made absolute against the context's
    /// base URL when `is_url` is set
    fn resolve_string_list(
        &self,
        rule: &str,
        context: &RuleContext<'_>,
        is_url: bool,
    ) -> Result<Vec<String>, RuleError>;
}
