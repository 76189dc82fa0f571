//! The normalized metadata record produced by extraction.
//!
//! A [`Work`] is constructed fresh per extraction, validated before it may
//! reach the ingestion client, and discarded once the outcome is reported.
//! There is no client-side cache or identity beyond the current page.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::normalize::compile_static_regex;

/// Wire shape of the upsert payload: `YYYY-MM-DD` release dates only.
static RELEASE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"^\d{4}-\d{2}-\d{2}$"));

/// Canonical serial-number shape: uppercase 2-6 letter prefix, hyphen,
/// numeric part zero-padded to at least 3 digits (never truncated).
static SERIAL_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"^[A-Z]{2,6}-\d{3,}$"));

/// Provenance links for a record: the current page URL, optionally paired
/// with a second link (e.g. a listing page plus the item's own page).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SourceLinks {
    /// A single provenance URL.
    One(String),
    /// An ordered sequence of provenance URLs.
    Many(Vec<String>),
}

impl SourceLinks {
    /// Returns all provenance URLs in order.
    #[must_use]
    pub fn urls(&self) -> Vec<&str> {
        match self {
            Self::One(url) => vec![url.as_str()],
            Self::Many(urls) => urls.iter().map(String::as_str).collect(),
        }
    }
}

/// A work's running time: integer seconds, or a source-native timecode
/// string (`"HH:MM:SS"`, `"120分"`, ISO-8601 durations) passed through as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DurationValue {
    /// Duration in whole seconds.
    Seconds(u64),
    /// Free-form timecode, kept exactly as the source rendered it.
    Timecode(String),
}

/// The normalized record. All fields optional except `title` and `source`.
///
/// Field names serialize in the collection API's casing (`serialNumber`,
/// `releaseDate`, ...). `cover` and `cover2` are two independent cover-art
/// candidates; adapters populate one, the other, or neither, and the two
/// are never merged into a single "best cover".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailer: Option<String>,
    pub source: SourceLinks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<Vec<String>>,
}

impl Work {
    /// Creates a record with only the required fields set.
    #[must_use]
    pub fn new(title: impl Into<String>, source: SourceLinks) -> Self {
        Self {
            title: title.into(),
            serial_number: None,
            cover: None,
            cover2: None,
            duration: None,
            release_date: None,
            producer: None,
            description: None,
            images: None,
            trailer: None,
            source,
            actors: None,
            directors: None,
            genres: None,
            series: None,
        }
    }

    /// Checks the record invariants.
    ///
    /// A record that fails validation must never be forwarded to the
    /// ingestion client; adapters call this as the last step of `extract`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] naming the first violated invariant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }

        if let Some(serial) = &self.serial_number
            && !SERIAL_NUMBER_RE.is_match(serial)
        {
            return Err(ValidationError::MalformedSerialNumber {
                value: serial.clone(),
            });
        }

        if let Some(date) = &self.release_date
            && !RELEASE_DATE_RE.is_match(date)
        {
            return Err(ValidationError::MalformedReleaseDate {
                value: date.clone(),
            });
        }

        let sources = self.source.urls();
        if sources.is_empty() {
            return Err(ValidationError::MissingSource);
        }
        for url in sources {
            require_absolute("source", url)?;
        }

        for (field, value) in [
            ("cover", &self.cover),
            ("cover2", &self.cover2),
            ("trailer", &self.trailer),
        ] {
            if let Some(value) = value {
                require_absolute(field, value)?;
            }
        }
        if let Some(images) = &self.images {
            for image in images {
                require_absolute("images", image)?;
            }
        }

        Ok(())
    }
}

fn require_absolute(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ValidationError::RelativeUrl {
            field,
            value: value.to_string(),
        })
    }
}

/// A record-level invariant violation detected at extraction time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Title is empty after trimming.
    #[error("work title is empty")]
    EmptyTitle,

    /// Serial number does not match the canonical `LETTERS-NNN` shape.
    #[error("serial number '{value}' is not in canonical LETTERS-NNN form")]
    MalformedSerialNumber { value: String },

    /// Release date is not strictly `YYYY-MM-DD`.
    #[error("release date '{value}' is not in YYYY-MM-DD form")]
    MalformedReleaseDate { value: String },

    /// The record carries no provenance link at all.
    #[error("work has no source link")]
    MissingSource,

    /// A URL-valued field holds a relative URL.
    #[error("field '{field}' holds non-absolute URL '{value}'")]
    RelativeUrl { field: &'static str, value: String },
}
