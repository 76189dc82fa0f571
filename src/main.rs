//! CLI entry point for the work exporter.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use exporter_core::prompt::ConsolePrompt;
use exporter_core::{
    ClientOptions, ConflictResolver, ExtractContext, Extraction, FetchRetryPolicy, IngestClient,
    OperatorPrompt, Outcome, PageFetcher, Resolution, StaticPrompt, Work, build_default_registry,
};
use tracing::{debug, info, warn};
use url::Url;

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let page_url = Url::parse(&args.url).with_context(|| format!("invalid page URL: {}", args.url))?;

    let options = ClientOptions::default();
    let policy = FetchRetryPolicy::with_max_attempts(args.fetch_retries + 1);
    let fetcher = PageFetcher::new(&options, policy).context("building page fetcher")?;
    let ingest = IngestClient::new(&args.api_base, &options)
        .with_context(|| format!("building API client for {}", args.api_base))?;

    let console = ConsolePrompt;
    let auto = StaticPrompt::new(true, args.serial.clone());
    let prompt: &dyn OperatorPrompt = if args.yes { &auto } else { &console };

    let registry = build_default_registry();
    let Some(adapter) = registry.select(&page_url) else {
        bail!("no adapter handles {page_url}");
    };
    info!(adapter = adapter.name(), url = %page_url, "extracting");

    let page = fetcher
        .fetch(&page_url)
        .await
        .with_context(|| format!("fetching {page_url}"))?;

    let ctx = ExtractContext {
        fetcher: &fetcher,
        prompt,
        serial_override: args.serial.clone(),
        wait_timeout: Duration::from_secs(args.wait_secs),
    };

    match adapter.extract(&page, &ctx).await.context("extraction failed")? {
        Extraction::Single(work) => {
            submit_work(&ingest, prompt, &work).await?;
        }
        Extraction::Cards(works) => {
            let selected: Vec<Work> = match args.card {
                Some(n) => {
                    let index = (n - 1) as usize;
                    if index >= works.len() {
                        bail!("--card {n} out of range; the page has {} cards", works.len());
                    }
                    vec![works[index].clone()]
                }
                None => works,
            };
            info!(count = selected.len(), "submitting listing cards");
            for work in &selected {
                submit_work(&ingest, prompt, work).await?;
            }
        }
        Extraction::Resources {
            serial_number,
            resources,
        } => {
            info!(
                serial_number,
                count = resources.len(),
                "importing download resources"
            );
            let imported = ingest
                .import_resources(&serial_number, &resources)
                .await
                .context("resource import failed")?;
            info!(imported, "resources imported");
        }
    }

    Ok(())
}

/// Submits one record and applies the single-pass conflict policy.
async fn submit_work(
    ingest: &IngestClient,
    prompt: &dyn OperatorPrompt,
    work: &Work,
) -> Result<()> {
    let outcome = ingest
        .submit(work)
        .await
        .with_context(|| format!("submitting '{}'", work.title))?;

    let Outcome::Conflict { fields } = outcome else {
        report(work, &outcome);
        return Ok(());
    };

    warn!(title = %work.title, ?fields, "submission conflicted");
    let key = IngestClient::upsert_key(work).to_string();
    let payload = serde_json::to_value(work).context("encoding record")?;
    let resolver = ConflictResolver::new(ingest, prompt);
    match resolver
        .resolve(&key, &payload, &fields)
        .await
        .context("conflict resubmission failed")?
    {
        Resolution::Resolved(outcome) => report(work, &outcome),
        Resolution::Declined => info!(title = %work.title, "left unsubmitted"),
        Resolution::Unresolved { fields } => {
            warn!(title = %work.title, ?fields, "still conflicting; resolve manually");
        }
    }
    Ok(())
}

fn report(work: &Work, outcome: &Outcome) {
    match outcome {
        Outcome::Created { id } => info!(title = %work.title, id, "created"),
        Outcome::Updated { id } => info!(title = %work.title, id, "updated"),
        Outcome::Ignored => info!(title = %work.title, "already up to date"),
        Outcome::Conflict { fields } => warn!(title = %work.title, ?fields, "conflict"),
    }
}
