//! Shared selector helpers for site adapters.

use scraper::{ElementRef, Html, Selector};

use super::ExtractError;

/// Parses a CSS selector at use site; panics on invalid pattern (all
/// adapter selectors are literals).
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid static selector '{css}': {e}"))
}

/// Collected, trimmed text of the first element matching `css`.
pub(crate) fn select_text(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css);
    document
        .select(&sel)
        .next()
        .map(|el| element_text(&el))
        .filter(|text| !text.is_empty())
}

/// Like [`select_text`], but a missing or empty element aborts extraction.
pub(crate) fn require_text(document: &Html, css: &str) -> Result<String, ExtractError> {
    select_text(document, css).ok_or_else(|| ExtractError::missing(css))
}

/// Trimmed text content of an element and its descendants.
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// An attribute of the first element matching `css`.
pub(crate) fn select_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let sel = selector(css);
    document
        .select(&sel)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `content` of a `<meta>` tag by `property` or `name`.
pub(crate) fn meta_content(document: &Html, key: &str) -> Option<String> {
    select_attr(
        document,
        &format!(r#"meta[property="{key}"]"#),
        "content",
    )
    .or_else(|| select_attr(document, &format!(r#"meta[name="{key}"]"#), "content"))
}

/// Trimmed texts of all elements matching `css` within `scope`; `None`
/// when nothing matched (optional list fields degrade to null, not `[]`).
pub(crate) fn texts_within(scope: &ElementRef<'_>, css: &str) -> Option<Vec<String>> {
    let sel = selector(css);
    let values: Vec<String> = scope
        .select(&sel)
        .map(|el| element_text(&el))
        .filter(|text| !text.is_empty())
        .collect();
    if values.is_empty() { None } else { Some(values) }
}

/// Document-scoped variant of [`texts_within`].
pub(crate) fn select_texts(document: &Html, css: &str) -> Option<Vec<String>> {
    let sel = selector(css);
    let values: Vec<String> = document
        .select(&sel)
        .map(|el| element_text(&el))
        .filter(|text| !text.is_empty())
        .collect();
    if values.is_empty() { None } else { Some(values) }
}
