//! HTML to chapter text formatting
//!
//! Chapter bodies come out of the content rule as HTML fragments. They are reduced
//! to one paragraph per line, each indented with two full-width spaces, keeping
//! inline images as `<img src="...">` markers with absolute URLs.

use scraper::{ElementRef, Html, Node};
use url::Url;

use crate::urls::absolute_url;

/// Indent placed before every paragraph
pub const PARAGRAPH_INDENT: &str = "\u{3000}\u{3000}";

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre",
    "section", "table", "td", "th", "tr", "ul",
];

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Attributes holding an image URL, most specific first (lazy loaders keep the real
/// URL out of `src`)
const IMAGE_ATTRS: &[&str] = &["data-original", "data-src", "src"];

/// Reduce an HTML fragment to indented paragraphs, keeping images
pub fn format_keep_img(html: &str, base_url: &Url) -> String {
    let fragment = Html::parse_fragment(html);
    let mut text = String::with_capacity(html.len());
    write_text(fragment.root_element(), base_url, &mut text);
    indent_paragraphs(&text)
}

fn write_text(element: ElementRef<'_>, base_url: &Url, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    write_element(el, base_url, out);
                }
            }
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, base_url: &Url, out: &mut String) {
    let name = element.value().name();
    if SKIPPED_TAGS.contains(&name) {
        return;
    }
    if name == "img" {
        if let Some(src) = image_src(element) {
            out.push_str(&format!("<img src=\"{}\">", absolute_url(base_url, src)));
        }
        return;
    }

    let block = BLOCK_TAGS.contains(&name);
    if block {
        out.push('\n');
    }
    write_text(element, base_url, out);
    if block {
        out.push('\n');
    }
}

fn image_src<'a>(element: ElementRef<'a>) -> Option<&'a str> {
    IMAGE_ATTRS.iter().find_map(|name| {
        element
            .value()
            .attr(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    })
}

/// Trim every line, drop blank ones and indent the rest
pub fn indent_paragraphs(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("{PARAGRAPH_INDENT}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
