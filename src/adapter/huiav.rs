//! Adapter for the `huiav.com` aggregator: no metadata record, only
//! download resources bound for the secondary import channel. Resource
//! lists render late, so extraction re-fetches until they are populated.

use std::sync::{LazyLock, Mutex, PoisonError};

use async_trait::async_trait;
use regex::Regex;
use scraper::ElementRef;
use url::Url;

use crate::ingest::ResourceDescriptor;
use crate::net::Page;
use crate::normalize::{compile_static_regex, resolve_url};
use crate::readiness::await_condition;

use super::utils::{element_text, selector};
use super::{ExtractContext, ExtractError, Extraction, SiteAdapter};

const HOST: &str = "www.huiav.com";

/// Stated size inside a magnet entry's description, e.g.
/// `文件大小： 1.2GB`. Commas, stray spaces and doubled dots appear in the
/// wild and are tolerated.
static FILESIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"文件大小：\s*-?((\d+[,\s])?\d+(\.\.?\d*)?)\s?(KB|MB|GB|GIB)")
});

static PATH_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"^/[^/]+/$"));

#[derive(Debug, Default, Clone, Copy)]
pub struct HuiavAdapter;

impl HuiavAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SiteAdapter for HuiavAdapter {
    fn name(&self) -> &str {
        "huiav"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str() == Some(HOST) && PATH_RE.is_match(url.path())
    }

    async fn extract(
        &self,
        page: &Page,
        ctx: &ExtractContext<'_>,
    ) -> Result<Extraction, ExtractError> {
        let serial_number = parse_serial_number(page)?;

        // The first parse may race the page's own rendering; fall back to
        // bounded re-fetching until either list is populated.
        let mut resources = parse_resources(page)?;
        if resources.is_empty() {
            resources = await_resources(page, ctx).await?;
        }

        Ok(Extraction::Resources {
            serial_number,
            resources,
        })
    }
}

fn parse_serial_number(page: &Page) -> Result<String, ExtractError> {
    let document = page.document();
    document
        .select(&selector(".site a"))
        .last()
        .map(|el| element_text(&el))
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ExtractError::missing(".site a"))
}

async fn await_resources(
    page: &Page,
    ctx: &ExtractContext<'_>,
) -> Result<Vec<ResourceDescriptor>, ExtractError> {
    let found: Mutex<Vec<ResourceDescriptor>> = Mutex::new(Vec::new());
    let found = &found;
    let fetcher = ctx.fetcher;
    let url = page.url();

    await_condition(
        || async move {
            let Ok(fresh) = fetcher.fetch(url).await else {
                return false;
            };
            let Ok(resources) = parse_resources(&fresh) else {
                return false;
            };
            if resources.is_empty() {
                return false;
            }
            *found.lock().unwrap_or_else(PoisonError::into_inner) = resources;
            true
        },
        || async move {
            std::mem::take(&mut *found.lock().unwrap_or_else(PoisonError::into_inner))
        },
        ctx.wait_timeout,
    )
    .await
    .map_err(ExtractError::from)
}

/// Collects both resource lists: online viewing entries first, magnet
/// entries second.
fn parse_resources(page: &Page) -> Result<Vec<ResourceDescriptor>, ExtractError> {
    let document = page.document();
    let mut resources = Vec::new();

    let list_boxes = selector(".list_box");
    let entries = selector("ul");
    if let Some(online) = document.select(&list_boxes).next() {
        for entry in online.select(&entries) {
            if let Some(resource) = online_entry(&entry, page.url())? {
                resources.push(resource);
            }
        }
    }

    let magnets = selector("#magnet ul");
    for entry in document.select(&magnets) {
        if let Some(resource) = magnet_entry(&entry) {
            resources.push(resource);
        }
    }

    Ok(resources)
}

fn online_entry(
    entry: &ElementRef<'_>,
    base: &Url,
) -> Result<Option<ResourceDescriptor>, ExtractError> {
    let title = entry_field(entry, ".title");
    let href = entry
        .select(&selector("a"))
        .next()
        .and_then(|link| link.value().attr("href"))
        .map(|href| href.replace('\n', ""));
    match (title, href) {
        (Some(title), Some(href)) => {
            let url = resolve_url(&href, base)?;
            Ok(Some(ResourceDescriptor::new(title, url, None)))
        }
        _ => Ok(None),
    }
}

fn magnet_entry(entry: &ElementRef<'_>) -> Option<ResourceDescriptor> {
    let title = entry_field(entry, ".title")?;
    let url = entry
        .select(&selector("span"))
        .next()
        .map(|span| element_text(&span).replace('\n', " "))
        .filter(|url| !url.is_empty())?;
    let filesize = entry_field(entry, ".intro").and_then(|intro| parse_filesize(&intro));
    Some(ResourceDescriptor::new(title, url, filesize))
}

fn entry_field(entry: &ElementRef<'_>, css: &str) -> Option<String> {
    entry
        .select(&selector(css))
        .next()
        .map(|el| element_text(&el).replace('\n', " "))
        .filter(|text| !text.is_empty())
}

/// Parses a stated size into bytes; an unstated or garbled size is simply
/// unknown, never an error.
fn parse_filesize(intro: &str) -> Option<u64> {
    let upper = intro.to_uppercase();
    let caps = FILESIZE_RE.captures(&upper)?;
    let number: f64 = caps[1]
        .replace([',', ' '], "")
        .replace("..", ".")
        .parse()
        .ok()?;
    let kib = match &caps[4] {
        "GB" | "GIB" => number * 1024.0 * 1024.0,
        "MB" => number * 1024.0,
        _ => number,
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bytes = (kib * 1024.0).round() as u64;
    Some(bytes)
}
