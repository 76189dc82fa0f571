//! Pure field normalizers: the functions that make records from unrelated
//! sources comparable and mergeable.
//!
//! Every normalizer fails loudly on unparsable input instead of producing a
//! garbage value; the caller decides whether the field was required.

mod preview;

pub use preview::derive_preview_image_url;

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;
use url::Url;

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Raw site-native serial code: optional numeric junk prefix, 2-6 letter
/// label, 3-5 digit number (e.g. `118abc00123`, `abc123`).
static RAW_SERIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"^\d{0,3}([A-Za-z]{2,6})(\d{3,5})$"));

/// Date formats accepted by [`normalize_date`], tried in order.
///
/// chrono's numeric fields accept unpadded values, so `2021-3-5` and
/// `2021/3/5` parse under the first two patterns.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%d %B %Y",
];

/// A field value that could not be normalized.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NormalizeError {
    /// No accepted date format matched.
    #[error("cannot parse date from '{value}'")]
    UnparsableDate { value: String },

    /// The raw value could not be resolved into an absolute URL.
    #[error("cannot resolve URL '{value}' against '{base}'")]
    UnresolvableUrl { value: String, base: String },

    /// The raw serial code does not match the expected shape; the caller
    /// must obtain an operator-supplied override rather than guess.
    #[error("serial number '{value}' does not match the expected shape")]
    SerialShape { value: String },
}

/// Parses a locale-formatted date and re-renders it as `YYYY-MM-DD` with
/// zero-padded month and day.
///
/// # Errors
///
/// Returns [`NormalizeError::UnparsableDate`] when no accepted format
/// matches; never silently yields a malformed date.
pub fn normalize_date(raw: &str) -> Result<String, NormalizeError> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
        .ok_or_else(|| NormalizeError::UnparsableDate {
            value: raw.to_string(),
        })
}

/// Resolves a possibly-relative URL against the page's base URL.
///
/// Absolute `http(s)` values pass through unchanged (idempotent);
/// protocol-relative `//...` values are upgraded to `https:`.
///
/// # Errors
///
/// Returns [`NormalizeError::UnresolvableUrl`] when joining fails.
pub fn resolve_url(raw: &str, base: &Url) -> Result<String, NormalizeError> {
    let trimmed = raw.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Ok(trimmed.to_string());
    }
    if trimmed.starts_with("//") {
        return Ok(format!("https:{trimmed}"));
    }
    base.join(trimmed)
        .map(|url| url.to_string())
        .map_err(|_| NormalizeError::UnresolvableUrl {
            value: raw.to_string(),
            base: base.to_string(),
        })
}

/// Canonicalizes a raw site-native serial code into `LETTERS-NNN` form:
/// uppercased 2-6 letter prefix, hyphen, numeric part zero-padded to at
/// least 3 digits. Longer numeric parts are kept whole, never truncated.
///
/// # Errors
///
/// Returns [`NormalizeError::SerialShape`] when the raw value does not
/// match; the adapter then goes through the manual-override prompt.
pub fn canonicalize_serial_number(raw: &str) -> Result<String, NormalizeError> {
    let trimmed = raw.trim();
    let captures = RAW_SERIAL_RE
        .captures(trimmed)
        .ok_or_else(|| NormalizeError::SerialShape {
            value: raw.to_string(),
        })?;

    let prefix = captures[1].to_ascii_uppercase();
    // Strip leading zeros via integer round-trip, then re-pad to 3.
    let number: u32 = captures[2]
        .parse()
        .map_err(|_| NormalizeError::SerialShape {
            value: raw.to_string(),
        })?;
    Ok(format!("{prefix}-{number:03}"))
}
