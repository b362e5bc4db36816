//! Self-checks run before the real pipeline.
//!
//! Each feed is fetched once and its first entries inspected, the page scraper
//! is run over a one-year window, and the Markdown renderer is exercised on a
//! fixed sample. A [`CheckStatus::Fail`] anywhere aborts the run; warnings are
//! reported and ignored.

use crate::config::{FeedSource, ScrapeTarget, SourceRegistry};
use crate::models::{Article, Digest, SourceOutcome, SourceResults};
use crate::outputs::markdown::{digest_to_markdown, empty_notice};
use crate::scrapers::feed::{self, EntryPolicy};
use crate::scrapers::page::{self, MonthDayLabels, ScrapeError};
use chrono::{DateTime, NaiveDate, Utc};
use feed_rs::model::Feed;
use futures::future::join_all;
use reqwest::Client;
use std::fmt;
use tracing::{error, info, instrument, warn};
use url::Url;

/// Window used by the checks so that quiet sources still yield something.
pub const CHECK_WINDOW_DAYS: i64 = 365;

/// Number of leading feed entries whose fields are verified.
const INSPECTED_ENTRIES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Pass => write!(f, "✓"),
            CheckStatus::Warn => write!(f, "!"),
            CheckStatus::Fail => write!(f, "✗"),
        }
    }
}

/// Result of one named check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            detail: detail.into(),
        }
    }

    fn log(&self) {
        match self.status {
            CheckStatus::Pass => info!(check = %self.name, detail = %self.detail, "Check passed"),
            CheckStatus::Warn => warn!(check = %self.name, detail = %self.detail, "Check warning"),
            CheckStatus::Fail => error!(check = %self.name, detail = %self.detail, "Check failed"),
        }
    }
}

/// All check results of one preflight pass, in execution order.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub results: Vec<CheckResult>,
}

impl CheckReport {
    pub fn passed(&self) -> usize {
        self.count(CheckStatus::Pass)
    }

    pub fn warnings(&self) -> usize {
        self.count(CheckStatus::Warn)
    }

    pub fn failures(&self) -> usize {
        self.count(CheckStatus::Fail)
    }

    /// True when nothing failed. Warnings do not block a run.
    pub fn is_ok(&self) -> bool {
        self.failures() == 0
    }

    fn count(&self, status: CheckStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.results {
            writeln!(f, "  {} {}: {}", result.status, result.name, result.detail)?;
        }
        write!(
            f,
            "結果: {}/{} 通過, {} 警告, {} 失敗",
            self.passed(),
            self.results.len(),
            self.warnings(),
            self.failures()
        )
    }
}

/// Judge a fetched feed.
///
/// No entries is a warning. A missing field in any of the first entries, or a
/// strict normalization error, is a failure.
pub fn feed_verdict(name: &str, parsed: &Feed, base: &Url, now: DateTime<Utc>) -> CheckResult {
    let entry_count = parsed.entries.len();
    if entry_count == 0 {
        return CheckResult::new(name, CheckStatus::Warn, "feed has 0 entries");
    }

    for (index, entry) in parsed.entries.iter().take(INSPECTED_ENTRIES).enumerate() {
        let missing = feed::missing_fields(entry);
        if !missing.is_empty() {
            return CheckResult::new(
                name,
                CheckStatus::Fail,
                format!("entry {} is missing: {}", index + 1, missing.join(", ")),
            );
        }
    }

    let cutoff = feed::cutoff(now, CHECK_WINDOW_DAYS);
    match feed::normalize_feed(parsed, base, cutoff, now, EntryPolicy::Strict) {
        Ok(articles) if articles.is_empty() => CheckResult::new(
            name,
            CheckStatus::Pass,
            format!("{entry_count} entries, none within {CHECK_WINDOW_DAYS} days"),
        ),
        Ok(articles) => CheckResult::new(
            name,
            CheckStatus::Pass,
            format!(
                "{entry_count} entries, {} within {CHECK_WINDOW_DAYS} days",
                articles.len()
            ),
        ),
        Err(e) => CheckResult::new(name, CheckStatus::Fail, e.to_string()),
    }
}

/// Fetch and judge one feed. Connection, status and parse errors fail.
#[instrument(level = "info", skip_all, fields(source = %source.name))]
pub async fn check_feed(client: &Client, source: &FeedSource, now: DateTime<Utc>) -> CheckResult {
    let base = match Url::parse(&source.url) {
        Ok(base) => base,
        Err(e) => return CheckResult::new(&source.name, CheckStatus::Fail, format!("invalid url: {e}")),
    };
    match feed::fetch_feed(client, &source.url).await {
        Ok(parsed) => feed_verdict(&source.name, &parsed, &base, now),
        Err(e) => CheckResult::new(&source.name, CheckStatus::Fail, e.to_string()),
    }
}

/// Judge a scrape over the check window.
///
/// Zero articles means the page layout has probably changed, so it fails. The
/// leading articles must carry `https` links and `YYYY-MM-DD` dates.
pub fn scraper_verdict(name: &str, scraped: Result<Vec<Article>, ScrapeError>) -> CheckResult {
    let articles = match scraped {
        Ok(articles) => articles,
        Err(e) => return CheckResult::new(name, CheckStatus::Fail, e.to_string()),
    };
    if articles.is_empty() {
        return CheckResult::new(
            name,
            CheckStatus::Fail,
            "0 articles found; the page layout may have changed",
        );
    }

    for (index, article) in articles.iter().take(INSPECTED_ENTRIES).enumerate() {
        if !article.link.starts_with("https://") {
            return CheckResult::new(
                name,
                CheckStatus::Fail,
                format!("article {} has a bad link: {}", index + 1, article.link),
            );
        }
        if article.title.trim().is_empty() || article.date_label().len() != 10 {
            return CheckResult::new(
                name,
                CheckStatus::Fail,
                format!("article {} has a bad title or date", index + 1),
            );
        }
    }

    CheckResult::new(
        name,
        CheckStatus::Pass,
        format!("{} articles found", articles.len()),
    )
}

#[instrument(level = "info", skip_all, fields(source = %target.name))]
pub async fn check_scraper(client: &Client, target: &ScrapeTarget, now: DateTime<Utc>) -> CheckResult {
    let scraped =
        page::scrape_recent_articles(client, &target.url, CHECK_WINDOW_DAYS, now, &MonthDayLabels).await;
    scraper_verdict(&target.name, scraped)
}

/// Render a fixed sample digest and look for every structural element.
pub fn check_renderer() -> CheckResult {
    const NAME: &str = "Markdown renderer";
    let sample_date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or(NaiveDate::MIN);
    let results: SourceResults = [
        (
            "Test Source".to_string(),
            SourceOutcome::Fetched(vec![Article::new(
                "Test Article",
                "https://example.com",
                sample_date,
            )]),
        ),
        ("Empty Source".to_string(), SourceOutcome::Fetched(vec![])),
    ]
    .into_iter()
    .collect();
    let digest = Digest::new(sample_date, 7, results);
    let md = digest_to_markdown(&digest);

    let notice = empty_notice(digest.days);
    let checks = [
        (md.contains("# 文章摘要"), "missing document heading"),
        (md.contains("## Test Source"), "missing source heading"),
        (md.contains("[Test Article](https://example.com)"), "missing article link"),
        (md.contains(notice.as_str()), "missing empty-source notice"),
        (md.contains("| 日期 | 標題 |"), "missing table header"),
    ];
    match checks.iter().find(|(ok, _)| !ok) {
        Some((_, problem)) => CheckResult::new(NAME, CheckStatus::Fail, *problem),
        None => CheckResult::new(NAME, CheckStatus::Pass, "sample digest rendered correctly"),
    }
}

/// Run every check for `registry`. Feeds are checked concurrently.
#[instrument(level = "info", skip_all)]
pub async fn run_preflight(client: &Client, registry: &SourceRegistry, now: DateTime<Utc>) -> CheckReport {
    info!(feeds = registry.feeds.len(), "Running preflight checks");

    let mut results = join_all(registry.feeds.iter().map(|source| check_feed(client, source, now))).await;
    results.push(check_scraper(client, &registry.scrape, now).await);
    results.push(check_renderer());

    for result in &results {
        result.log();
    }
    let report = CheckReport { results };
    info!(
        passed = report.passed(),
        warnings = report.warnings(),
        failures = report.failures(),
        "Preflight complete"
    );
    report
}
