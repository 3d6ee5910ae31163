//! URL helpers shared by the extractor, evaluator and paginator

use url::Url;

/// Resolve `href` against `base`, returning the absolute form.
///
/// Values that cannot be joined (such as `javascript:` fragments that fail to parse)
/// are returned trimmed but otherwise untouched.
pub fn absolute_url(base: &Url, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    match base.join(href) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Parse a URL used as a resolution base, falling back to a placeholder for
/// relative or malformed inputs so that absolute candidates still resolve.
pub fn base_url(raw: &str) -> Url {
    Url::parse(raw.trim()).unwrap_or_else(|_| {
        tracing::debug!(url = raw, "base url is not absolute; using placeholder");
        Url::parse("about:blank").expect("static url parses")
    })
}
