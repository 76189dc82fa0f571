//! Adapter for the `venus.*` network gallery listings: one record per
//! thumbnail card on a model page.

use async_trait::async_trait;
use scraper::ElementRef;
use url::Url;

use crate::net::Page;
use crate::normalize::resolve_url;
use crate::work::{SourceLinks, Work};

use super::utils::{selector, texts_within};
use super::{ExtractContext, ExtractError, Extraction, SiteAdapter};

const HOSTS: [&str; 2] = ["venus.allfinegirls.com", "venus.wowgirls.com"];

/// Listing-page adapter; every card under the content list that carries a
/// preview becomes its own record.
#[derive(Debug, Default, Clone, Copy)]
pub struct WowNetworkAdapter;

impl WowNetworkAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SiteAdapter for WowNetworkAdapter {
    fn name(&self) -> &str {
        "wow-network"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| HOSTS.contains(&host))
            && url.path().starts_with("/girl/")
    }

    async fn extract(
        &self,
        page: &Page,
        _ctx: &ExtractContext<'_>,
    ) -> Result<Extraction, ExtractError> {
        let works = parse_cards(page)?;
        for work in &works {
            work.validate()?;
        }
        Ok(Extraction::Cards(works))
    }
}

fn parse_cards(page: &Page) -> Result<Vec<Work>, ExtractError> {
    let document = page.document();
    let cards = selector(".cf_content_list div");
    let preview = selector(".preview");

    let mut works = Vec::new();
    for card in document.select(&cards) {
        if card.select(&preview).next().is_none() {
            continue;
        }
        works.push(parse_card(page, &card)?);
    }

    if works.is_empty() {
        return Err(ExtractError::missing(".cf_content_list div .preview"));
    }
    Ok(works)
}

fn parse_card(page: &Page, card: &ElementRef<'_>) -> Result<Work, ExtractError> {
    let title_link = selector("a.title");
    let thumb = selector(".thumb img");

    let link = card
        .select(&title_link)
        .next()
        .ok_or_else(|| ExtractError::missing("a.title"))?;
    let title = link.text().collect::<String>().trim().to_string();

    // Each card links to its own detail page; both the listing and the
    // detail URL identify the record.
    let detail = link
        .value()
        .attr("href")
        .map(|href| resolve_url(href, page.url()))
        .transpose()?;
    let source = match detail {
        Some(detail) => SourceLinks::Many(vec![page.url().to_string(), detail]),
        None => SourceLinks::One(page.url().to_string()),
    };

    let mut work = Work::new(title, source);
    work.cover2 = card
        .select(&thumb)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(|src| resolve_url(src, page.url()))
        .transpose()?;
    work.actors = texts_within(card, ".models a");
    work.genres = texts_within(card, ".genres a");

    Ok(work)
}
