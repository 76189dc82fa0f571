//! CLI argument definitions using clap derive macros.

use clap::Parser;

/// Default collection API endpoint.
pub const DEFAULT_API_BASE: &str = "https://127.0.0.1/study/api/v1";

/// Extract a normalized work record from a supported page and submit it
/// to the collection API.
#[derive(Parser, Debug)]
#[command(name = "work-exporter")]
#[command(author, version)]
pub struct Args {
    /// Page URL to extract from
    pub url: String,

    /// Base URL of the collection API
    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Serial number to use when the page's own code cannot be formatted
    #[arg(long)]
    pub serial: Option<String>,

    /// Answer yes to confirmations instead of prompting (non-interactive)
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// On listing pages, submit only the Nth card (1-based)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub card: Option<u32>,

    /// Budget in seconds for pages that render their data late (1-120)
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..=120))]
    pub wait_secs: u64,

    /// Extra fetch attempts for transient page-fetch failures (0-10)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub fetch_retries: u32,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
