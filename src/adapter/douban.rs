//! Adapter for `movie.douban.com` subject pages: the metadata ships as an
//! embedded JSON-LD block, with cast and summary read from the DOM.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use url::Url;

use crate::net::Page;
use crate::normalize::{compile_static_regex, normalize_date};
use crate::work::{DurationValue, SourceLinks, Work};

use super::utils::{require_text, select_text, selector};
use super::{ExtractContext, ExtractError, Extraction, SiteAdapter};

const HOST: &str = "movie.douban.com";

/// Page titles carry a site suffix: `Some Title (豆瓣)`.
const TITLE_SUFFIX: &str = "(豆瓣)";

/// Indented line continuations inside the summary block.
static SUMMARY_WS_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"\n\s+"));

/// The JSON-LD subject payload embedded in the page head.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubjectData {
    url: String,
    image: Option<String>,
    duration: Option<String>,
    date_published: Option<String>,
    #[serde(default)]
    genre: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DoubanAdapter;

impl DoubanAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SiteAdapter for DoubanAdapter {
    fn name(&self) -> &str {
        "douban"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str() == Some(HOST) && url.path().starts_with("/subject/")
    }

    async fn extract(
        &self,
        page: &Page,
        _ctx: &ExtractContext<'_>,
    ) -> Result<Extraction, ExtractError> {
        let work = parse_subject(page)?;
        work.validate()?;
        Ok(Extraction::Single(work))
    }
}

fn parse_subject(page: &Page) -> Result<Work, ExtractError> {
    let document = page.document();

    let raw = require_text(&document, r#"script[type="application/ld+json"]"#)?;
    // The block carries raw newlines inside string values, which is not
    // valid JSON; strip them before parsing.
    let sanitized = raw.replace('\n', "");
    let data: SubjectData =
        serde_json::from_str(&sanitized).map_err(|_| ExtractError::Unparsable {
            field: "subject data",
            value: truncate(&sanitized),
        })?;

    let heading = require_text(&document, "title")?;
    let title = heading
        .strip_suffix(TITLE_SUFFIX)
        .map_or(heading.as_str(), str::trim_end)
        .to_string();

    let mut work = Work::new(title, SourceLinks::One(format!("https://{HOST}{}", data.url)));
    // Swap the sized poster variant for the raw original.
    work.cover = data
        .image
        .map(|image| image.replace("s_ratio_poster", "raw").replace(".webp", ".jpg"));
    // ISO-8601 durations (`PT1H57M`) pass through as timecodes.
    work.duration = data.duration.map(DurationValue::Timecode);
    work.release_date = match data.date_published.as_deref().map(str::trim) {
        // The date may carry a region suffix, e.g. `2021-03-05(中国大陆)`.
        Some(raw) if !raw.is_empty() => {
            let bare = raw.split('(').next().unwrap_or(raw);
            Some(normalize_date(bare)?)
        }
        _ => None,
    };
    work.description = select_text(&document, r#"span[property="v:summary"]"#)
        .map(|summary| SUMMARY_WS_RE.replace_all(&summary, "\n").into_owned());
    work.actors = meta_contents(&document, "video:actor");
    work.directors = meta_contents(&document, "video:director");
    if !data.genre.is_empty() {
        work.genres = Some(data.genre);
    }

    Ok(work)
}

/// `content` of every `<meta>` tag with the given property, in order.
fn meta_contents(document: &Html, property: &str) -> Option<Vec<String>> {
    let metas = selector(&format!(r#"meta[property="{property}"]"#));
    let values: Vec<String> = document
        .select(&metas)
        .filter_map(|meta| meta.value().attr("content"))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();
    if values.is_empty() { None } else { Some(values) }
}

fn truncate(raw: &str) -> String {
    raw.chars().take(80).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SUBJECT_PAGE: &str = r#"
        <html><head>
          <title>测试电影 (豆瓣)</title>
          <meta property="video:actor" content="Alice">
          <meta property="video:actor" content="Bob">
          <meta property="video:director" content="Carol">
          <script type="application/ld+json">
            {
              "name": "测试电影",
              "url": "/subject/1234567/",
              "image": "https://img9.doubanio.com/view/photo/s_ratio_poster/public/p1.webp",
              "datePublished": "2021-03-05(中国大陆)",
              "duration": "PT1H57M",
              "genre": ["剧情", "犯罪"],
              "description": "a description
broken across lines",
              "@type": "Movie"
            }
          </script>
        </head><body>
          <span property="v:summary">
            First paragraph.
            Second paragraph.
          </span>
        </body></html>"#;

    fn page(html: &str) -> Page {
        Page::new(
            Url::parse("https://movie.douban.com/subject/1234567/").unwrap(),
            html,
        )
    }

    #[test]
    fn test_matches_subject_pages_only() {
        let adapter = DoubanAdapter::new();
        assert!(adapter.matches(&Url::parse("https://movie.douban.com/subject/1234567/").unwrap()));
        assert!(adapter.matches(
            &Url::parse("https://movie.douban.com/subject/1234567/?from=showing").unwrap()
        ));
        assert!(!adapter.matches(&Url::parse("https://movie.douban.com/explore").unwrap()));
        assert!(!adapter.matches(&Url::parse("https://book.douban.com/subject/1/").unwrap()));
    }

    #[test]
    fn test_extracts_full_record_from_json_ld() {
        let work = parse_subject(&page(SUBJECT_PAGE)).unwrap();

        assert_eq!(work.title, "测试电影");
        assert_eq!(
            work.cover.as_deref(),
            Some("https://img9.doubanio.com/view/photo/raw/public/p1.jpg")
        );
        assert_eq!(
            work.duration,
            Some(DurationValue::Timecode("PT1H57M".to_string()))
        );
        assert_eq!(work.release_date.as_deref(), Some("2021-03-05"));
        assert_eq!(
            work.source,
            SourceLinks::One("https://movie.douban.com/subject/1234567/".to_string())
        );
        assert_eq!(
            work.actors,
            Some(vec!["Alice".to_string(), "Bob".to_string()])
        );
        assert_eq!(work.directors, Some(vec!["Carol".to_string()]));
        assert_eq!(
            work.genres,
            Some(vec!["剧情".to_string(), "犯罪".to_string()])
        );
        work.validate().unwrap();
    }

    #[test]
    fn test_summary_indentation_collapses_to_single_newlines() {
        let work = parse_subject(&page(SUBJECT_PAGE)).unwrap();
        assert_eq!(
            work.description.as_deref(),
            Some("First paragraph.\nSecond paragraph.")
        );
    }

    #[test]
    fn test_missing_json_ld_aborts() {
        let html = "<html><head><title>Bare (豆瓣)</title></head></html>";
        assert!(matches!(
            parse_subject(&page(html)),
            Err(ExtractError::MissingElement { .. })
        ));
    }

    #[test]
    fn test_garbled_json_ld_is_unparsable() {
        let html = r#"
            <html><head>
              <title>Bad (豆瓣)</title>
              <script type="application/ld+json">not json</script>
            </head></html>"#;
        assert!(matches!(
            parse_subject(&page(html)),
            Err(ExtractError::Unparsable {
                field: "subject data",
                ..
            })
        ));
    }

    #[test]
    fn test_unparsable_release_date_aborts() {
        let html = r#"
            <html><head>
              <title>Bad Date (豆瓣)</title>
              <script type="application/ld+json">
                {"url": "/subject/1/", "datePublished": "coming soon"}
              </script>
            </head></html>"#;
        assert!(matches!(
            parse_subject(&page(html)),
            Err(ExtractError::Normalize(_))
        ));
    }

    #[test]
    fn test_optional_fields_degrade_to_null() {
        let html = r#"
            <html><head>
              <title>Sparse Title (豆瓣)</title>
              <script type="application/ld+json">{"url": "/subject/1/"}</script>
            </head></html>"#;
        let work = parse_subject(&page(html)).unwrap();
        assert_eq!(work.title, "Sparse Title");
        assert_eq!(work.cover, None);
        assert_eq!(work.release_date, None);
        assert_eq!(work.description, None);
        assert_eq!(work.genres, None);
    }
}
