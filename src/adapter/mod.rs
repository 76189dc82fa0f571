//! Per-site extraction adapters.
//!
//! This module provides the extraction contract that turns arbitrary,
//! sometimes asynchronously-rendered page state into a normalized
//! [`Work`], plus the registry that maps a page URL onto the applicable
//! adapter.
//!
//! # Architecture
//!
//! - [`SiteAdapter`] - Async trait individual site adapters implement
//! - [`AdapterRegistry`] - Declarative origin+path dispatch table
//! - [`Extraction`] - Single record, per-card records, or aggregator resources
//! - [`ExtractError`] - Failure taxonomy; a failed extraction never yields
//!   a partially-null record
//! - [`DoubanAdapter`], [`FanzaAdapter`], [`MetArtAdapter`],
//!   [`VixenAdapter`], [`WowNetworkAdapter`], [`IafdAdapter`],
//!   [`HuiavAdapter`] - site glue

mod douban;
mod fanza;
mod huiav;
mod iafd;
mod metart;
mod registry;
mod utils;
mod vixen;
mod wow_network;

pub use douban::DoubanAdapter;
pub use fanza::FanzaAdapter;
pub use huiav::HuiavAdapter;
pub use iafd::IafdAdapter;
pub use metart::MetArtAdapter;
pub use registry::{AdapterRegistry, build_default_registry};
pub use vixen::VixenAdapter;
pub use wow_network::WowNetworkAdapter;

pub use crate::net::Page;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::ingest::ResourceDescriptor;
use crate::net::{FetchError, PageFetcher};
use crate::normalize::{NormalizeError, canonicalize_serial_number};
use crate::prompt::OperatorPrompt;
use crate::readiness::ReadinessError;
use crate::work::{ValidationError, Work};

/// Default budget for readiness-waited extractions.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything an adapter may need beyond the already-fetched page:
/// follow-up fetches, operator prompts, and the readiness budget.
pub struct ExtractContext<'a> {
    pub fetcher: &'a PageFetcher,
    pub prompt: &'a dyn OperatorPrompt,
    /// Pre-supplied serial number, bypassing the interactive override.
    pub serial_override: Option<String>,
    pub wait_timeout: Duration,
}

/// What an adapter produced from one page.
#[derive(Debug, Clone)]
pub enum Extraction {
    /// One record for the whole page.
    Single(Work),
    /// One record per repeated card fragment on a listing page; each is
    /// submitted independently.
    Cards(Vec<Work>),
    /// Download-resource descriptors from an aggregator page, bound for
    /// the secondary import channel instead of the upsert flow.
    Resources {
        serial_number: String,
        resources: Vec<ResourceDescriptor>,
    },
}

/// Why an extraction was aborted. Required-field failures abort the whole
/// extraction; optional fields degrade to `None` instead of erroring.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A required DOM element was not found.
    #[error("required element '{selector}' not found on page")]
    MissingElement { selector: String },

    /// A required field's raw value could not be interpreted.
    #[error("cannot parse {field} from '{value}'")]
    Unparsable { field: &'static str, value: String },

    /// The operator cancelled a manual override.
    #[error("extraction cancelled: {reason}")]
    Cancelled { reason: String },

    /// A field normalizer rejected a required value.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    /// The assembled record violated a schema invariant.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Awaited page state never settled.
    #[error(transparent)]
    NotReady(#[from] ReadinessError),

    /// A follow-up fetch failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl ExtractError {
    pub(crate) fn missing(selector: impl Into<String>) -> Self {
        Self::MissingElement {
            selector: selector.into(),
        }
    }
}

/// Site-specific extraction logic behind a common contract.
///
/// Adapter selection is purely declarative: [`SiteAdapter::matches`] tests
/// the page's origin and path shape, and the registry activates at most
/// one adapter per page. `extract` owns the full trigger → wait → parse
/// sequence for its site; it must not mutate anything beyond the
/// interactions a triggering request represents.
///
/// # Object Safety
///
/// Uses `async_trait` to support dynamic dispatch via `Box<dyn SiteAdapter>`.
/// Rust 2024 native async traits are not object-safe, so `async_trait` is
/// required for the registry pattern.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// The adapter's name (e.g. "fanza", "iafd").
    fn name(&self) -> &str;

    /// Whether this adapter handles the given page URL.
    fn matches(&self, url: &Url) -> bool;

    /// Extracts one or more normalized records from the page.
    async fn extract(
        &self,
        page: &Page,
        ctx: &ExtractContext<'_>,
    ) -> Result<Extraction, ExtractError>;
}

/// Canonicalizes a raw serial code, falling back to the operator override
/// path when the automatic derivation is ambiguous.
///
/// A pre-supplied override wins outright; otherwise the operator is asked
/// once, and an empty or cancelled answer aborts the extraction. The
/// answer is validated later by [`Work::validate`], never guessed at.
pub(crate) fn resolve_serial_number(
    raw: &str,
    ctx: &ExtractContext<'_>,
) -> Result<String, ExtractError> {
    match canonicalize_serial_number(raw) {
        Ok(serial) => Ok(serial),
        Err(NormalizeError::SerialShape { .. }) => {
            if let Some(serial) = &ctx.serial_override {
                return Ok(serial.trim().to_string());
            }
            ctx.prompt
                .input(
                    "Cannot format serial number. Please input manually.",
                    &raw.to_uppercase(),
                )
                .ok_or_else(|| ExtractError::Cancelled {
                    reason: format!("no manual serial number supplied for '{raw}'"),
                })
        }
        Err(error) => Err(error.into()),
    }
}
