//! Source collection and per-article enrichment.
//!
//! 1. **Collect**: every feed and the scrape target are fetched concurrently;
//!    results are merged back in registry order and any error is confined to
//!    its own [`SourceOutcome::Failed`].
//! 2. **Enrich**: each article's page is extracted and summarized through an
//!    ordered `buffered` stream, so discovery order survives.

use crate::api::{AskAsync, Summarizer};
use crate::config::{FeedSource, ScrapeTarget, SourceRegistry};
use crate::extract::extract_content;
use crate::models::{SourceOutcome, SourceResults};
use crate::scrapers::feed::{self, EntryPolicy};
use crate::scrapers::page::{self, MonthDayLabels};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::time::Instant;
use tracing::{error, info, instrument};

async fn collect_feed(
    client: &Client,
    source: &FeedSource,
    days: i64,
    now: DateTime<Utc>,
) -> (String, SourceOutcome) {
    let outcome =
        match feed::fetch_recent_articles(client, &source.url, days, now, EntryPolicy::Strict).await {
            Ok(articles) => SourceOutcome::Fetched(articles),
            Err(e) => {
                error!(source = %source.name, url = %source.url, error = %e, "Feed failed; continuing without it");
                SourceOutcome::failed(e)
            }
        };
    (source.name.clone(), outcome)
}

async fn collect_page(
    client: &Client,
    target: &ScrapeTarget,
    days: i64,
    now: DateTime<Utc>,
) -> (String, SourceOutcome) {
    let outcome =
        match page::scrape_recent_articles(client, &target.url, days, now, &MonthDayLabels).await {
            Ok(articles) => SourceOutcome::Fetched(articles),
            Err(e) => {
                error!(source = %target.name, url = %target.url, error = %e, "Scrape failed; continuing without it");
                SourceOutcome::failed(e)
            }
        };
    (target.name.clone(), outcome)
}

/// Fetch every source in `registry` and return their outcomes in registry order.
#[instrument(level = "info", skip(client, registry, now))]
pub async fn collect_sources(
    client: &Client,
    registry: &SourceRegistry,
    days: i64,
    now: DateTime<Utc>,
) -> SourceResults {
    let t0 = Instant::now();
    let feeds = join_all(
        registry
            .feeds
            .iter()
            .map(|source| collect_feed(client, source, days, now)),
    );
    let scraped = collect_page(client, &registry.scrape, days, now);
    let (feeds, scraped) = futures::join!(feeds, scraped);

    let results: SourceResults = feeds.into_iter().chain(std::iter::once(scraped)).collect();
    for (name, outcome) in results.iter() {
        match outcome {
            SourceOutcome::Fetched(articles) => {
                info!(source = %name, count = articles.len(), days, "Found recent articles")
            }
            SourceOutcome::Failed { reason } => info!(source = %name, %reason, "Source unavailable"),
        }
    }
    info!(
        sources = results.len(),
        articles = results.article_count(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Collected sources"
    );
    results
}

/// Attach summaries to every collected article.
///
/// Does nothing when the summarizer is disabled. At most `concurrency`
/// articles are in flight at once; an article whose page cannot be extracted
/// or summarized keeps `summary: None`.
#[instrument(level = "info", skip(client, summarizer, results))]
pub async fn enrich_articles<A>(
    client: &Client,
    summarizer: &Summarizer<A>,
    results: &mut SourceResults,
    concurrency: usize,
) where
    A: AskAsync<Response = String>,
{
    if !summarizer.is_enabled() {
        info!("Summaries disabled; skipping content extraction");
        return;
    }

    let jobs: Vec<(String, String)> = results
        .iter()
        .flat_map(|(_, outcome)| outcome.articles())
        .map(|article| (article.title.clone(), article.link.clone()))
        .collect();
    let total = jobs.len();
    let t0 = Instant::now();
    info!(total, "Starting article summarization");

    let summaries: Vec<Option<String>> = stream::iter(jobs)
        .map(|(title, link)| async move {
            let content = extract_content(client, &link).await?;
            summarizer.summarize(&title, &content).await
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut summaries = summaries.into_iter();
    let mut summarized = 0usize;
    for (_, outcome) in results.iter_mut() {
        let Some(articles) = outcome.articles_mut() else {
            continue;
        };
        for article in articles.iter_mut() {
            let summary = summaries.next().flatten();
            summarized += usize::from(summary.is_some());
            *article = article.clone().with_summary(summary);
        }
    }

    info!(
        total,
        summarized,
        without_summary = total - summarized,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Completed article summarization"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Article;
    use chrono::{NaiveDate, TimeZone};
    use std::error::Error;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Blog</title><link>https://blog.example.com</link><description>d</description>
<item><title>Fresh post</title><link>https://blog.example.com/fresh</link><pubDate>Fri, 16 Oct 2026 08:00:00 GMT</pubDate></item>
<item><title>Stale post</title><link>https://blog.example.com/stale</link><pubDate>Mon, 01 Jun 2026 08:00:00 GMT</pubDate></item>
</channel></rss>"#;

    const PAGE: &str = r#"<html><body>
<div class="card"><a href="/articles/discovery">
  <div>OCT 17</div><h3>Continuous discovery in practice for teams</h3>
</a></div>
</body></html>"#;

    #[tokio::test]
    async fn test_collect_sources_isolates_failures_and_keeps_order() {
        let mut server = mockito::Server::new_async().await;
        let _good = server
            .mock("GET", "/good.xml")
            .with_status(200)
            .with_body(FEED)
            .create_async()
            .await;
        let _bad = server.mock("GET", "/bad.xml").with_status(500).create_async().await;
        let _page = server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(PAGE)
            .create_async()
            .await;

        let registry = SourceRegistry {
            feeds: vec![
                FeedSource {
                    name: "Broken".to_string(),
                    url: format!("{}/bad.xml", server.url()),
                },
                FeedSource {
                    name: "Blog".to_string(),
                    url: format!("{}/good.xml", server.url()),
                },
            ],
            scrape: ScrapeTarget {
                name: "Page".to_string(),
                url: server.url(),
            },
        };

        let results = collect_sources(&Client::new(), &registry, 7, now()).await;

        let names: Vec<&str> = results.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Broken", "Blog", "Page"]);
        assert!(results.get("Broken").unwrap().is_failed());

        let blog = results.get("Blog").unwrap().articles();
        assert_eq!(blog.len(), 1);
        assert_eq!(blog[0].title, "Fresh post");

        let page = results.get("Page").unwrap().articles();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].link, format!("{}/articles/discovery", server.url()));
        assert_eq!(results.article_count(), 2);
    }

    /// Replies with a summary naming the article's title line.
    #[derive(Debug, Default)]
    struct EchoBackend;

    impl AskAsync for EchoBackend {
        type Response = String;

        async fn ask(&self, _instruction: &str, text: &str) -> Result<String, Box<dyn Error>> {
            let title = text.lines().next().unwrap_or_default();
            Ok(format!("Summary of {title}"))
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    #[tokio::test]
    async fn test_enrich_articles_in_order_and_skips_unreachable() {
        let mut server = mockito::Server::new_async().await;
        let mut mocks = Vec::new();
        for path in ["/a", "/c"] {
            let mock = server
                .mock("GET", path)
                .with_status(200)
                .with_body(format!("<html><body><article><p>Body of {path}</p></article></body></html>"))
                .create_async()
                .await;
            mocks.push(mock);
        }
        let _missing = server.mock("GET", "/b").with_status(404).create_async().await;

        let mut results: SourceResults = [
            (
                "One".to_string(),
                SourceOutcome::Fetched(vec![
                    Article::new("A", format!("{}/a", server.url()), day()),
                    Article::new("B", format!("{}/b", server.url()), day()),
                ]),
            ),
            ("Down".to_string(), SourceOutcome::failed("timeout")),
            (
                "Two".to_string(),
                SourceOutcome::Fetched(vec![Article::new("C", format!("{}/c", server.url()), day())]),
            ),
        ]
        .into_iter()
        .collect();

        let summarizer = Summarizer::with_backend(EchoBackend);
        enrich_articles(&Client::new(), &summarizer, &mut results, 2).await;

        let one = results.get("One").unwrap().articles();
        assert_eq!(one[0].summary.as_deref(), Some("Summary of 標題：A"));
        assert_eq!(one[1].summary, None);
        let two = results.get("Two").unwrap().articles();
        assert_eq!(two[0].summary.as_deref(), Some("Summary of 標題：C"));
        assert!(results.get("Down").unwrap().is_failed());
    }

    #[tokio::test]
    async fn test_disabled_summarizer_fetches_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", mockito::Matcher::Any).expect(0).create_async().await;

        let mut results: SourceResults = [(
            "One".to_string(),
            SourceOutcome::Fetched(vec![Article::new("A", format!("{}/a", server.url()), day())]),
        )]
        .into_iter()
        .collect();
        let before = results.clone();

        let summarizer: Summarizer<EchoBackend> = Summarizer::disabled();
        enrich_articles(&Client::new(), &summarizer, &mut results, 4).await;

        assert_eq!(results, before);
        mock.assert_async().await;
    }
}
