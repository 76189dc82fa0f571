//! Thumbnail-to-preview image URL rewriting.
//!
//! These are string-rewrite heuristics tuned to the path conventions
//! observed on the source CDN: an ordered rule list where the first
//! matching rule wins. The final rule is a generic token substitution that
//! applies when nothing else matched; it may be visually wrong for path
//! shapes the rule list has never seen, and callers treat the result as
//! best-effort. Do not add rules that are not implied by observed coverage.

use std::sync::LazyLock;

use regex::Regex;

use super::compile_static_regex;

static SMALL_PACKAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(p[a-z]\.)jpg"));
static GAME_SAMPLE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"js-[0-9]+\.jpg$"));
static THUMB_SAMPLE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"ts-[0-9]+\.jpg$"));
static NUMBERED_SAMPLE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(-[0-9]+\.)jpg$"));

/// Rewrites a low-resolution thumbnail path into its high-resolution
/// preview counterpart. First matching rule wins; the trailing fallback is
/// a generic substitution whose correctness is unverified for
/// unanticipated path shapes.
#[must_use]
pub fn derive_preview_image_url(thumbnail_url: &str) -> String {
    // Package thumbnails: `...ps.jpg` and friends become `...pl.jpg`.
    if let Some(captures) = SMALL_PACKAGE_RE.captures(thumbnail_url) {
        return thumbnail_url.replacen(&captures[1], "pl.", 1);
    }

    // Store-hosted samples key the filename off the product id segment.
    if thumbnail_url.contains("store") {
        return rewrite_store_path(thumbnail_url);
    }

    // Console-game assets drop the sample marker entirely.
    if thumbnail_url.contains("consumer_game") {
        return thumbnail_url.replacen("js-", "-", 1);
    }

    if GAME_SAMPLE_RE.is_match(thumbnail_url) {
        return thumbnail_url.replacen("js-", "jp-", 1);
    }

    if THUMB_SAMPLE_RE.is_match(thumbnail_url) {
        return thumbnail_url.replacen("ts-", "tl-", 1);
    }

    if let Some(captures) = NUMBERED_SAMPLE_RE.captures(thumbnail_url) {
        let suffix = &captures[1];
        return thumbnail_url.replacen(suffix, &format!("jp{suffix}"), 1);
    }

    // Fallback: generic token substitution, best-effort only.
    thumbnail_url.replacen('-', "jp-", 1)
}

fn rewrite_store_path(thumbnail_url: &str) -> String {
    let segments: Vec<&str> = thumbnail_url.split('/').collect();
    let product_id = if segments.len() >= 2 {
        segments[segments.len() - 2]
    } else {
        ""
    };

    let keyed_thumb =
        compile_static_regex(&format!("{}/{}ts-[0-9]+\\.jpg$", regex::escape(product_id), regex::escape(product_id)));
    if !product_id.is_empty() && keyed_thumb.is_match(thumbnail_url) {
        thumbnail_url.replacen("ts-", "tl-", 1)
    } else {
        thumbnail_url.replacen('-', "jp-", 1)
    }
}
