//! Adapter for the MetArt network movie pages (`straplez.com`,
//! `metartx.com`). The synopsis is revealed asynchronously, so extraction
//! polls the movie API until it settles.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::net::Page;
use crate::normalize::{compile_static_regex, normalize_date};
use crate::readiness::await_condition;
use crate::work::{DurationValue, SourceLinks, Work};

use super::utils::{element_text, select_attr, selector, texts_within};
use super::{ExtractContext, ExtractError, Extraction, SiteAdapter};

const HOSTS: [&str; 2] = ["www.straplez.com", "www.metartx.com"];

/// Fallback cover source: the player preview's inline background style.
static PREVIEW_STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"url\((?:&quot;|")(.*?)(?:&quot;|")\)"#));

#[derive(Debug, Default, Clone, Copy)]
pub struct MetArtAdapter;

impl MetArtAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SiteAdapter for MetArtAdapter {
    fn name(&self) -> &str {
        "metart"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| HOSTS.contains(&host))
            && url.path().starts_with("/model/")
            && url.path().contains("/movie/")
    }

    async fn extract(
        &self,
        page: &Page,
        ctx: &ExtractContext<'_>,
    ) -> Result<Extraction, ExtractError> {
        // Parse everything available in the initial document first; the
        // parsed DOM must not live across the description await.
        let mut work = parse_static(page)?;
        work.description = await_description(page, ctx).await?;
        work.validate()?;
        Ok(Extraction::Single(work))
    }
}

fn parse_static(page: &Page) -> Result<Work, ExtractError> {
    let document = page.document();
    let info = movie_data(&document);

    let title = document
        .select(&selector("ol.container li"))
        .last()
        .map(|el| element_text(&el))
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ExtractError::missing("ol.container li"))?;

    let mut work = Work::new(title, SourceLinks::One(page.url().to_string()));
    work.cover = select_attr(&document, ".movie-details .panel-content img", "src");
    work.cover2 = Some(cover_image(&document)?);
    work.duration = select_attr(&document, r#"meta[property="og:video:duration"]"#, "content")
        .and_then(|seconds| seconds.parse::<u64>().ok())
        .map(DurationValue::Seconds);
    work.release_date = match info.get("Released:") {
        Some(value) => Some(normalize_date(&element_text(value))?),
        None => None,
    };
    work.producer = select_attr(&document, ".logo img", "alt");
    work.actors = info.get("Cast:").and_then(|value| texts_within(value, "a"));
    work.directors = info
        .get("Director:")
        .and_then(|value| texts_within(value, "a"));
    work.genres = video_tags(&document);

    Ok(work)
}

/// Key/value pairs of the movie-data list; values keep their element so
/// link lists stay extractable.
fn movie_data<'a>(document: &'a Html) -> HashMap<String, ElementRef<'a>> {
    let items = selector(r#"ul[data-testid="movie-data"] li"#);
    let spans = selector("span");
    document
        .select(&items)
        .filter_map(|item| {
            let mut fields = item.select(&spans);
            let key = fields.next().map(|span| element_text(&span))?;
            let value = fields.last()?;
            Some((key, value))
        })
        .collect()
}

/// The large cover: a dedicated image when present, otherwise dug out of
/// the player preview's background style. No cover at all aborts.
fn cover_image(document: &Html) -> Result<String, ExtractError> {
    if let Some(src) = select_attr(document, ".cover-image", "src") {
        return Ok(src);
    }
    let style = select_attr(document, "div.jw-preview", "style").ok_or_else(|| {
        ExtractError::missing(".cover-image, div.jw-preview")
    })?;
    PREVIEW_STYLE_RE
        .captures(&style)
        .map(|caps| caps[1].to_string())
        .ok_or(ExtractError::Unparsable {
            field: "cover",
            value: style,
        })
}

fn video_tags(document: &Html) -> Option<Vec<String>> {
    let metas = selector(r#"meta[property="og:video:tag"]"#);
    let tags: Vec<String> = document
        .select(&metas)
        .filter_map(|meta| meta.value().attr("content"))
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect();
    if tags.is_empty() { None } else { Some(tags) }
}

/// Polls the site's movie API until the synopsis is populated; the initial
/// document only carries a collapsed stub.
async fn await_description(
    page: &Page,
    ctx: &ExtractContext<'_>,
) -> Result<Option<String>, ExtractError> {
    let mut api = page.url().clone();
    api.set_path("/api/movie");
    api.set_query(Some(&format!("path={}", page.url().path())));
    debug!(api = %api, "awaiting movie synopsis");

    let found: Mutex<Option<String>> = Mutex::new(None);
    let found = &found;
    let api = &api;
    let fetcher = ctx.fetcher;
    let description = await_condition(
        || async move {
            let Ok(body) = fetcher.fetch_text(api).await else {
                return false;
            };
            let Some(description) = parse_description(&body) else {
                return false;
            };
            *found.lock().unwrap_or_else(PoisonError::into_inner) = Some(description);
            true
        },
        || async move { found.lock().unwrap_or_else(PoisonError::into_inner).take() },
        ctx.wait_timeout,
    )
    .await?;

    Ok(description)
}

fn parse_description(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToString::to_string)
}
