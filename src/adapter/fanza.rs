//! Adapter for the FANZA shop (`dmm.co.jp`): physical DVD listings and
//! digital video listings share an info table but differ in image layout
//! and trailer plumbing.

use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::warn;
use url::Url;

use crate::net::{Page, PageFetcher};
use crate::normalize::{
    compile_static_regex, derive_preview_image_url, normalize_date, resolve_url,
};
use crate::work::{DurationValue, SourceLinks, Work};

use super::utils::{meta_content, require_text, select_attr, selector, texts_within};
use super::{ExtractContext, ExtractError, Extraction, SiteAdapter, resolve_serial_number};

const HOST: &str = "www.dmm.co.jp";

/// Inline player trigger on digital listings.
static SAMPLE_PLAY_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"sampleplay\('(/digital/[^']+)'\)"));

/// Embedded player frame source.
static FRAME_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"src="([^"]+)""#));

/// Video source inside the player's config JSON.
static PLAYER_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#""src":\s*"([^"]+)""#));

/// Video source inside the VR player script.
static VR_SAMPLE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"sampleUrl\s*=\s*"([^"]+)""#));

/// The two listing variants under the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Goods {
    Dvd,
    Video,
}

impl Goods {
    fn of(url: &Url) -> Option<Self> {
        if url.path().starts_with("/mono/dvd/") {
            Some(Self::Dvd)
        } else if url.path().starts_with("/digital/videoa/") {
            Some(Self::Video)
        } else {
            None
        }
    }
}

/// How to obtain the trailer once the synchronous parse is done.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TrailerPlan {
    None,
    /// Player page wrapping an iframe; two fetches away from the video.
    Framed(String),
    /// VR player script; one fetch away from the video.
    VrScript(String),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FanzaAdapter;

impl FanzaAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SiteAdapter for FanzaAdapter {
    fn name(&self) -> &str {
        "fanza"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str() == Some(HOST) && Goods::of(url).is_some()
    }

    async fn extract(
        &self,
        page: &Page,
        ctx: &ExtractContext<'_>,
    ) -> Result<Extraction, ExtractError> {
        let Some(goods) = Goods::of(page.url()) else {
            return Err(ExtractError::missing("supported listing path"));
        };
        // All DOM work happens synchronously; only the trailer plan is
        // carried across the await.
        let (mut work, plan) = parse_listing(page, goods, ctx)?;
        work.trailer = fetch_trailer(ctx.fetcher, page.url(), plan).await;
        work.validate()?;
        Ok(Extraction::Single(work))
    }
}

fn parse_listing(
    page: &Page,
    goods: Goods,
    ctx: &ExtractContext<'_>,
) -> Result<(Work, TrailerPlan), ExtractError> {
    let document = page.document();
    let info = info_table(&document);

    let title = require_text(&document, "h1#title")?;
    let mut work = Work::new(title, SourceLinks::One(page.url().to_string()));

    let raw_serial = info_text(&info, "品番：").ok_or_else(|| ExtractError::missing("品番："))?;
    work.serial_number = Some(resolve_serial_number(&raw_serial, ctx)?);

    work.duration = info_text(&info, "収録時間：").map(DurationValue::Timecode);
    let released = info_text(&info, "発売日：")
        .or_else(|| info_text(&info, "商品発売日："))
        .ok_or_else(|| ExtractError::missing("発売日："))?;
    work.release_date = Some(normalize_date(&released)?);
    work.producer = info_text(&info, "メーカー：");
    work.actors = info_links(&info, "出演者：");
    work.directors = info_links(&info, "監督：");
    work.genres = info_links(&info, "ジャンル：");
    work.series = info_links(&info, "シリーズ：");

    match goods {
        Goods::Dvd => {
            work.description = require_text(&document, "p.mg-b20").ok();
            work.cover = select_attr(&document, "#package-modal-image1 img", "src")
                .map(|src| resolve_url(&src, page.url()))
                .transpose()?;
            work.cover2 = meta_content(&document, "og:image");
            work.images = sample_images_dvd(&document, page.url())?;
        }
        Goods::Video => {
            work.description = meta_content(&document, "description");
            work.cover = meta_content(&document, "og:image");
            work.cover2 = select_attr(&document, r#"a[name="package-image"]"#, "href")
                .map(|href| resolve_url(&href, page.url()))
                .transpose()?;
            work.images = sample_images_video(&document, page.url())?;
        }
    }

    let plan = trailer_plan(&document, goods);
    Ok((work, plan))
}

/// The listing's info table: full-width-colon label to value cell.
fn info_table<'a>(document: &'a Html) -> HashMap<String, ElementRef<'a>> {
    let rows = selector("table.mg-b20 tr");
    let cells = selector("td");
    document
        .select(&rows)
        .filter_map(|row| {
            let mut columns = row.select(&cells);
            let key = columns.next()?.text().collect::<String>().trim().to_string();
            let value = columns.next()?;
            Some((key, value))
        })
        .collect()
}

fn info_text(info: &HashMap<String, ElementRef<'_>>, key: &str) -> Option<String> {
    info.get(key)
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty() && text != "----")
}

fn info_links(info: &HashMap<String, ElementRef<'_>>, key: &str) -> Option<Vec<String>> {
    info.get(key).and_then(|cell| texts_within(cell, "a"))
}

/// DVD sample thumbnails, each rewritten to its preview-size variant.
fn sample_images_dvd(
    document: &Html,
    base: &Url,
) -> Result<Option<Vec<String>>, ExtractError> {
    let thumbs = selector(".fn-sampleImage li.fn-sampleImage__zoom img");
    let mut images = Vec::new();
    for img in document.select(&thumbs) {
        let Some(src) = img
            .value()
            .attr("data-lazy")
            .or_else(|| img.value().attr("src"))
        else {
            continue;
        };
        images.push(resolve_url(&derive_preview_image_url(src), base)?);
    }
    Ok(if images.is_empty() { None } else { Some(images) })
}

/// Digital listings link full-size sample images directly.
fn sample_images_video(
    document: &Html,
    base: &Url,
) -> Result<Option<Vec<String>>, ExtractError> {
    let links = selector("#sample-image-block a");
    let mut images = Vec::new();
    for link in document.select(&links) {
        if let Some(href) = link.value().attr("href") {
            images.push(resolve_url(href, base)?);
        }
    }
    Ok(if images.is_empty() { None } else { Some(images) })
}

fn trailer_plan(document: &Html, goods: Goods) -> TrailerPlan {
    match goods {
        Goods::Dvd => select_attr(document, "#detail-sample-movie a", "data-video-url")
            .map_or(TrailerPlan::None, TrailerPlan::Framed),
        Goods::Video => {
            if let Some(onclick) = select_attr(document, "#detail-sample-movie a", "onclick")
                && let Some(caps) = SAMPLE_PLAY_RE.captures(&onclick)
            {
                return TrailerPlan::Framed(caps[1].to_string());
            }
            if let Some(onclick) = select_attr(document, "#detail-sample-vr-movie a", "onclick")
                && let Some(caps) = SAMPLE_PLAY_RE.captures(&onclick)
            {
                return TrailerPlan::VrScript(caps[1].to_string());
            }
            TrailerPlan::None
        }
    }
}

/// Follows the trailer plan; any failure along the way degrades to no
/// trailer rather than aborting the extraction.
async fn fetch_trailer(fetcher: &PageFetcher, base: &Url, plan: TrailerPlan) -> Option<String> {
    let result = match plan {
        TrailerPlan::None => return None,
        TrailerPlan::Framed(path) => framed_trailer(fetcher, base, &path).await,
        TrailerPlan::VrScript(path) => vr_trailer(fetcher, base, &path).await,
    };
    match result {
        Ok(trailer) => Some(trailer),
        Err(error) => {
            warn!(%error, "trailer lookup failed; continuing without one");
            None
        }
    }
}

async fn framed_trailer(
    fetcher: &PageFetcher,
    base: &Url,
    path: &str,
) -> Result<String, ExtractError> {
    let player_url = join(base, path)?;
    let player = fetcher.fetch_text(&player_url).await?;
    let frame_src = FRAME_SRC_RE
        .captures(&player)
        .map(|caps| caps[1].to_string())
        .ok_or(ExtractError::Unparsable {
            field: "trailer frame",
            value: player_url.to_string(),
        })?;

    let frame_url = join(base, &frame_src)?;
    let config = fetcher.fetch_text(&frame_url).await?;
    let src = PLAYER_SRC_RE
        .captures(&config)
        .map(|caps| caps[1].replace("\\/", "/"))
        .ok_or(ExtractError::Unparsable {
            field: "trailer",
            value: frame_url.to_string(),
        })?;
    Ok(resolve_url(&src, base)?)
}

async fn vr_trailer(
    fetcher: &PageFetcher,
    base: &Url,
    path: &str,
) -> Result<String, ExtractError> {
    let script_url = join(base, path)?;
    let script = fetcher.fetch_text(&script_url).await?;
    let src = VR_SAMPLE_RE
        .captures(&script)
        .map(|caps| caps[1].to_string())
        .ok_or(ExtractError::Unparsable {
            field: "trailer",
            value: script_url.to_string(),
        })?;
    Ok(resolve_url(&src, base)?)
}

fn join(base: &Url, path: &str) -> Result<Url, ExtractError> {
    let absolute = resolve_url(path, base)?;
    Url::parse(&absolute).map_err(|_| ExtractError::Unparsable {
        field: "trailer url",
        value: path.to_string(),
    })
}
