//! Work Exporter Core Library
//!
//! This library extracts structured "Work" metadata records from
//! heterogeneous third-party pages, normalizes them to one common schema,
//! and submits them to a local collection API with an idempotent,
//! conflict-aware upsert protocol.
//!
//! # Architecture
//!
//! - [`work`] - The normalized record and its invariants
//! - [`normalize`] - Pure field normalizers (dates, URLs, serial numbers, image paths)
//! - [`readiness`] - Bounded polling primitive for asynchronously-rendered content
//! - [`net`] - Shared HTTP client policy, page fetching, and fetch retry
//! - [`prompt`] - Operator prompts for ambiguous input
//! - [`adapter`] - Per-site extraction adapters and their registry
//! - [`ingest`] - Upsert client and conflict resolution

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod adapter;
pub mod ingest;
pub mod net;
pub mod normalize;
pub mod prompt;
pub mod readiness;
pub mod work;

// Re-export commonly used types
pub use adapter::{
    AdapterRegistry, ExtractContext, ExtractError, Extraction, Page, SiteAdapter,
    build_default_registry,
};
pub use ingest::{ConflictResolver, IngestClient, IngestError, Outcome, Resolution};
pub use net::{ClientOptions, FetchError, FetchRetryPolicy, PageFetcher};
pub use prompt::{OperatorPrompt, StaticPrompt};
pub use readiness::{POLL_INTERVAL, ReadinessError, await_condition};
pub use work::{DurationValue, SourceLinks, ValidationError, Work};
