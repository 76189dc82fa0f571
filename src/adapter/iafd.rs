//! Adapter for `iafd.com` title pages: a plain heading/value table,
//! fully rendered at load time.

use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use url::Url;

use crate::net::Page;
use crate::normalize::{compile_static_regex, normalize_date};
use crate::work::{DurationValue, SourceLinks, Work};

use super::utils::{element_text, require_text, select_texts, selector};
use super::{ExtractContext, ExtractError, Extraction, SiteAdapter};

const HOST: &str = "www.iafd.com";

/// Page titles carry the release year: `Some Title (2021)`.
static TITLE_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"^(.+)\(\d{4}\)$"));

/// Synchronous adapter: `parse` runs immediately against rendered DOM.
#[derive(Debug, Default, Clone, Copy)]
pub struct IafdAdapter;

impl IafdAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SiteAdapter for IafdAdapter {
    fn name(&self) -> &str {
        "iafd"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str() == Some(HOST) && url.path().starts_with("/title.rme/")
    }

    async fn extract(
        &self,
        page: &Page,
        _ctx: &ExtractContext<'_>,
    ) -> Result<Extraction, ExtractError> {
        let work = parse_title_page(page)?;
        work.validate()?;
        Ok(Extraction::Single(work))
    }
}

fn parse_title_page(page: &Page) -> Result<Work, ExtractError> {
    let document = page.document();
    let info = bio_table(&document);

    let heading = require_text(&document, ".container h1")?;
    let title = TITLE_YEAR_RE
        .captures(&heading)
        .map(|caps| caps[1].trim().to_string())
        .ok_or(ExtractError::Unparsable {
            field: "title",
            value: heading.clone(),
        })?;

    let mut work = Work::new(title, SourceLinks::One(page.url().to_string()));
    work.duration = info
        .get("Minutes")
        .and_then(|minutes| minutes.parse::<u64>().ok())
        .map(|minutes| DurationValue::Seconds(minutes * 60));
    work.release_date = match info.get("Release Date") {
        // A present but unparsable date aborts; absence degrades to null.
        Some(raw) => Some(normalize_date(raw)?),
        None => None,
    };
    work.producer = info.get("Studio").cloned();
    work.description = select_texts(&document, "#synopsis .padded-panel li")
        .map(|lines| lines.join("\n"));
    work.actors = select_texts(&document, ".castbox a");

    Ok(work)
}

/// Zips the interleaved heading/value paragraphs into a lookup table.
fn bio_table(document: &Html) -> HashMap<String, String> {
    let headings = selector("p.bioheading");
    let values = selector("p.biodata");
    document
        .select(&headings)
        .map(|el| element_text(&el))
        .zip(document.select(&values).map(|el| element_text(&el)))
        .collect()
}
