//! Adapter for `vixen.com`: detail pages embed their full record as JSON
//! in a `__NEXT_DATA__` script tag; performer pages are card listings.

use async_trait::async_trait;
use scraper::ElementRef;
use serde::Deserialize;
use url::Url;

use crate::net::Page;
use crate::normalize::{normalize_date, resolve_url};
use crate::work::{DurationValue, SourceLinks, Work};

use super::utils::{select_text, selector, texts_within};
use super::{ExtractContext, ExtractError, Extraction, SiteAdapter};

const HOST: &str = "www.vixen.com";
const PRODUCER: &str = "VIXEN";

#[derive(Debug, Deserialize)]
struct NextData {
    props: NextProps,
}

#[derive(Debug, Deserialize)]
struct NextProps {
    #[serde(rename = "pageProps")]
    page_props: PageProps,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageProps {
    title: String,
    description: Option<String>,
    structured_data: Option<StructuredData>,
    #[serde(default)]
    gallery_images: Vec<GalleryImage>,
    video: Option<VideoProps>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructuredData {
    thumbnail_url: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GalleryImage {
    src: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoProps {
    #[serde(default)]
    images: VideoImages,
    #[serde(default)]
    models_slugged: Vec<Named>,
    #[serde(default)]
    directors: Vec<Named>,
}

#[derive(Debug, Default, Deserialize)]
struct VideoImages {
    #[serde(default)]
    poster: Vec<Poster>,
}

#[derive(Debug, Deserialize)]
struct Poster {
    #[serde(default)]
    width: u32,
    src: Option<String>,
    highdpi: Option<HighDpi>,
}

#[derive(Debug, Deserialize)]
struct HighDpi {
    double: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct VixenAdapter;

impl VixenAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SiteAdapter for VixenAdapter {
    fn name(&self) -> &str {
        "vixen"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str() == Some(HOST)
            && (url.path().starts_with("/videos/") || url.path().starts_with("/performers/"))
    }

    async fn extract(
        &self,
        page: &Page,
        _ctx: &ExtractContext<'_>,
    ) -> Result<Extraction, ExtractError> {
        if page.url().path().starts_with("/videos/") {
            let work = parse_detail(page)?;
            work.validate()?;
            Ok(Extraction::Single(work))
        } else {
            let works = parse_performer_cards(page)?;
            for work in &works {
                work.validate()?;
            }
            Ok(Extraction::Cards(works))
        }
    }
}

fn parse_detail(page: &Page) -> Result<Work, ExtractError> {
    let document = page.document();
    let raw = select_text(&document, "script#__NEXT_DATA__")
        .ok_or_else(|| ExtractError::missing("script#__NEXT_DATA__"))?;
    let data: NextData = serde_json::from_str(&raw).map_err(|_| ExtractError::Unparsable {
        field: "page data",
        value: truncate(&raw),
    })?;
    let props = data.props.page_props;

    let mut work = Work::new(props.title, SourceLinks::One(page.url().to_string()));
    work.producer = Some(PRODUCER.to_string());
    work.description = props.description;

    if let Some(structured) = props.structured_data {
        work.cover = structured.thumbnail_url;
        work.duration = structured.duration.map(DurationValue::Timecode);
    }
    if let Some(video) = props.video {
        // Highest-resolution poster wins; its retina variant when present.
        work.cover2 = video
            .images
            .poster
            .into_iter()
            .max_by_key(|poster| poster.width)
            .and_then(|poster| poster.highdpi.and_then(|hd| hd.double).or(poster.src));
        work.actors = names(video.models_slugged);
        work.directors = names(video.directors);
    }
    if !props.gallery_images.is_empty() {
        work.images = Some(
            props
                .gallery_images
                .into_iter()
                .map(|image| image.src)
                .collect(),
        );
    }
    work.release_date = match select_text(&document, r#"[title="Release date"] span"#) {
        Some(raw) => Some(normalize_date(&raw)?),
        None => None,
    };

    Ok(work)
}

fn parse_performer_cards(page: &Page) -> Result<Vec<Work>, ExtractError> {
    let document = page.document();
    let cards = selector(r#"div[class^="Grid__Item"]"#);

    let works = document
        .select(&cards)
        .map(|card| parse_card(page, &card))
        .collect::<Result<Vec<_>, _>>()?;
    if works.is_empty() {
        return Err(ExtractError::missing(r#"div[class^="Grid__Item"]"#));
    }
    Ok(works)
}

fn parse_card(page: &Page, card: &ElementRef<'_>) -> Result<Work, ExtractError> {
    let title_sel = selector(r#"a[data-test-component="TitleLink"]"#);
    let date_sel = selector(r#"div[data-test-component="ReleaseDateFormatted"]"#);
    let picture_sel = selector("picture img");
    let video_sel = selector("video");

    let title = card
        .select(&title_sel)
        .next()
        .map(|link| link.text().collect::<String>().trim().to_string())
        .ok_or_else(|| ExtractError::missing(r#"a[data-test-component="TitleLink"]"#))?;

    let mut work = Work::new(title, SourceLinks::One(page.url().to_string()));
    work.producer = Some(PRODUCER.to_string());
    work.cover2 = card
        .select(&picture_sel)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(|src| resolve_url(src, page.url()))
        .transpose()?;
    work.release_date = card
        .select(&date_sel)
        .next()
        .map(|el| normalize_date(el.text().collect::<String>().trim()))
        .transpose()?;
    work.trailer = card
        .select(&video_sel)
        .next()
        .and_then(|video| video.value().attr("src"))
        .map(|src| resolve_url(src, page.url()))
        .transpose()?;
    work.actors = texts_within(card, r#"div[data-test-component="Models"] a"#);

    Ok(work)
}

fn names(entries: Vec<Named>) -> Option<Vec<String>> {
    if entries.is_empty() {
        None
    } else {
        Some(entries.into_iter().map(|entry| entry.name).collect())
    }
}

fn truncate(raw: &str) -> String {
    raw.chars().take(80).collect()
}
