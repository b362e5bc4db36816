//! # pm_digest
//!
//! Collects recent product-management articles, summarizes them, writes a
//! Markdown digest and pushes a compact version to a LINE group.
//!
//! ## Features
//!
//! - Reads RSS/Atom feeds (Lenny's Newsletter, SVPG, Intercom Blog, Andrew Chen)
//!   and scrapes the Mind the Product listing page
//! - Filters everything to a recency window (7 days by default)
//! - Summarizes each article through an OpenAI-compatible chat API when a key
//!   is configured
//! - Writes `output/digest_YYYY-MM-DD.md` and pushes a compact text digest
//! - Runs preflight checks first and aborts when a source is structurally broken
//!
//! ## Usage
//!
//! ```sh
//! pm_digest              # preflight + full run
//! pm_digest check        # preflight only
//! pm_digest setup        # print LINE group ids from webhook events
//! ```
//!
//! ## Architecture
//!
//! 1. **Preflight**: verify every source and the renderer
//! 2. **Collecting**: fetch feeds and the scraped page concurrently
//! 3. **Summarizing**: extract article text and summarize (ordered, N at a time)
//! 4. **Output**: write the Markdown digest, print it, push the compact form

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::process::ExitCode;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod extract;
mod models;
mod notify;
mod outputs;
mod pipeline;
mod preflight;
mod scrapers;
mod utils;
mod webhook;

use api::Summarizer;
use cli::{Cli, Command};
use config::{Config, SourceRegistry};
use models::Digest;
use notify::{Notifier, NotifyOutcome};
use outputs::compact;
use reqwest::Client;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    if dotenv::dotenv().is_ok() {
        debug!("Loaded .env");
    }

    let start_time = std::time::Instant::now();
    info!("pm_digest starting up");

    // Parse CLI
    let args = Cli::parse();
    let command = args.selected_command();
    debug!(?command, output_dir = %args.options.output_dir.display(), days = args.options.days, "Parsed CLI arguments");

    if let Command::Setup { port } = command {
        webhook::serve(port).await?;
        return Ok(ExitCode::SUCCESS);
    }

    // ---- Configuration ----
    let registry = match &args.options.sources {
        Some(path) => SourceRegistry::from_yaml_file(path).await?,
        None => SourceRegistry::default(),
    };
    let config = Config::from_options(&args.options, registry);
    let client = scrapers::build_client(config.http_timeout)?;
    info!(
        days = config.days,
        sources = config.registry.source_names().len(),
        summaries = config.llm.api_key.is_some(),
        notify = config.notify,
        "Configuration loaded"
    );

    let code = match command {
        Command::Check => check(&client, &config).await,
        _ => run(&client, &config, args.options.skip_preflight).await?,
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(code)
}

/// Run the preflight checks and print the report.
async fn check(client: &Client, config: &Config) -> ExitCode {
    let report = preflight::run_preflight(client, &config.registry, Utc::now()).await;
    println!("{report}");
    if report.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Full pipeline: preflight, collect, summarize, write, print, push.
#[instrument(level = "info", skip_all)]
async fn run(client: &Client, config: &Config, skip_preflight: bool) -> Result<ExitCode, Box<dyn Error>> {
    // Early check: ensure output dir is writable
    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    if skip_preflight {
        warn!("Skipping preflight checks");
    } else {
        let report = preflight::run_preflight(client, &config.registry, Utc::now()).await;
        if !report.is_ok() {
            eprintln!("{report}");
            error!(failures = report.failures(), "Preflight failed; aborting run");
            return Ok(ExitCode::FAILURE);
        }
    }

    // ---- Collect ----
    let now = Utc::now();
    let mut results = pipeline::collect_sources(client, &config.registry, config.days, now).await;

    // ---- Summarize ----
    let summarizer = Summarizer::from_config(&config.llm, client);
    pipeline::enrich_articles(client, &summarizer, &mut results, config.concurrency).await;

    // ---- Output ----
    let digest = Digest::new(now.date_naive(), config.days, results);
    let path = outputs::write_digest(&config.output_dir, &digest).await?;
    println!("{}", outputs::markdown::digest_to_markdown(&digest));
    info!(path = %path.display(), articles = digest.results.article_count(), "Digest written");

    // ---- Notify ----
    if config.notify {
        let notifier = Notifier::from_config(&config.line, client);
        match notifier.push(&compact::digest_to_compact(&digest)).await {
            NotifyOutcome::Sent => info!("Digest pushed"),
            NotifyOutcome::Skipped => info!("Digest push skipped"),
            outcome => error!(%outcome, "Digest push failed; the file was still written"),
        }
    } else {
        info!("Notification disabled by flag");
    }

    Ok(ExitCode::SUCCESS)
}
