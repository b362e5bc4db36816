//! Syndication feed normalizer.
//!
//! Fetches a feed, keeps the entries published inside the recency window and
//! maps them to [`Article`]s in the feed's own order. Any format `feed-rs`
//! understands (RSS 0.9x/1.0/2.0, Atom, JSON Feed) is accepted.
//!
//! # Window
//!
//! The cutoff is `now - days` in UTC. An entry published exactly at the cutoff
//! is kept.

use crate::models::Article;
use chrono::{DateTime, Duration, Utc};
use feed_rs::model::{Entry, Feed};
use feed_rs::parser::{self, ParseFeedError};
use reqwest::{Client, StatusCode};
use std::error::Error;
use std::fmt;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// What to do with an entry that lacks a title, link or publication date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryPolicy {
    /// Fail the whole feed (production default).
    #[default]
    Strict,
    /// Log and drop the entry.
    Skip,
}

/// Failures while acquiring a feed.
#[derive(Debug)]
pub enum FeedError {
    InvalidUrl(url::ParseError),
    Http(reqwest::Error),
    Status { status: StatusCode, url: String },
    Parse(ParseFeedError),
    MalformedEntry { index: usize, missing: Vec<&'static str> },
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::InvalidUrl(e) => write!(f, "invalid feed url: {e}"),
            FeedError::Http(e) => write!(f, "feed request failed: {e}"),
            FeedError::Status { status, url } => write!(f, "feed {url} answered {status}"),
            FeedError::Parse(e) => write!(f, "feed could not be parsed: {e}"),
            FeedError::MalformedEntry { index, missing } => write!(
                f,
                "entry {} is missing: {}",
                index + 1,
                missing.join(", ")
            ),
        }
    }
}

impl Error for FeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FeedError::InvalidUrl(e) => Some(e),
            FeedError::Http(e) => Some(e),
            FeedError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        FeedError::Http(e)
    }
}

impl From<ParseFeedError> for FeedError {
    fn from(e: ParseFeedError) -> Self {
        FeedError::Parse(e)
    }
}

impl From<url::ParseError> for FeedError {
    fn from(e: url::ParseError) -> Self {
        FeedError::InvalidUrl(e)
    }
}

/// Start of the recency window ending at `now`.
pub fn cutoff(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - Duration::days(days.max(0))
}

/// Names of the required fields an entry does not provide.
pub fn missing_fields(entry: &Entry) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if entry_title(entry).is_none() {
        missing.push("title");
    }
    if entry_link(entry).is_none() {
        missing.push("link");
    }
    if entry.published.is_none() {
        missing.push("published");
    }
    missing
}

fn entry_title(entry: &Entry) -> Option<&str> {
    entry
        .title
        .as_ref()
        .map(|t| t.content.trim())
        .filter(|t| !t.is_empty())
}

/// The entry's article link: the first `alternate` (or untyped) link, else the first link.
fn entry_link(entry: &Entry) -> Option<&str> {
    entry
        .links
        .iter()
        .find(|l| l.rel.as_deref().is_none_or(|rel| rel == "alternate"))
        .or_else(|| entry.links.first())
        .map(|l| l.href.trim())
        .filter(|href| !href.is_empty())
}

/// Download and parse a feed without filtering it.
#[instrument(level = "info", skip(client))]
pub async fn fetch_feed(client: &Client, url: &str) -> Result<Feed, FeedError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::Status {
            status,
            url: url.to_string(),
        });
    }
    let bytes = response.bytes().await?;
    let feed = parser::parse(bytes.as_ref())?;
    debug!(entries = feed.entries.len(), "Parsed feed");
    Ok(feed)
}

/// Map the entries of `feed` published at or after `cutoff` to articles.
///
/// Relative links are resolved against `base`. Dates after `now` are clamped
/// to `now` so no article is ever dated in the future.
pub fn normalize_feed(
    feed: &Feed,
    base: &Url,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
    policy: EntryPolicy,
) -> Result<Vec<Article>, FeedError> {
    let mut articles = Vec::new();

    for (index, entry) in feed.entries.iter().enumerate() {
        let (Some(title), Some(href), Some(published)) =
            (entry_title(entry), entry_link(entry), entry.published)
        else {
            let missing = missing_fields(entry);
            match policy {
                EntryPolicy::Strict => return Err(FeedError::MalformedEntry { index, missing }),
                EntryPolicy::Skip => {
                    warn!(index, ?missing, "Skipping malformed feed entry");
                    continue;
                }
            }
        };

        if published < cutoff {
            continue;
        }

        let link = base.join(href)?;
        articles.push(Article::new(
            title,
            link.to_string(),
            published.min(now).date_naive(),
        ));
    }

    Ok(articles)
}

/// Fetch `url` and return the articles published within the last `days` days.
///
/// A feed without entries yields an empty list. Network, status, parse and
/// (under [`EntryPolicy::Strict`]) malformed-entry failures are returned to the
/// caller, which decides how to isolate them.
///
/// # Arguments
///
/// * `client` - Shared HTTP client
/// * `url` - Feed URL; relative entry links are resolved against it
/// * `days` - Recency window; an entry dated exactly on the cutoff is kept
/// * `now` - Reference instant for the window and the future-date clamp
/// * `policy` - What to do with an entry missing its title, link or date
///
/// # Returns
///
/// Recent articles in feed order, or a [`FeedError`] for the whole feed.
///
/// # Example
///
/// ```ignore
/// let articles = fetch_recent_articles(&client, "https://www.svpg.com/feed/", 7, Utc::now(), EntryPolicy::Strict).await?;
/// ```
#[instrument(level = "info", skip(client, now, policy))]
pub async fn fetch_recent_articles(
    client: &Client,
    url: &str,
    days: i64,
    now: DateTime<Utc>,
    policy: EntryPolicy,
) -> Result<Vec<Article>, FeedError> {
    let base = Url::parse(url)?;
    let feed = fetch_feed(client, url).await?;
    if feed.entries.is_empty() {
        warn!(%url, "Feed has no entries");
    }
    let articles = normalize_feed(&feed, &base, cutoff(now, days), now, policy)?;
    info!(
        count = articles.len(),
        entries = feed.entries.len(),
        days,
        "Collected recent feed articles"
    );
    Ok(articles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn base() -> Url {
        Url::parse("https://blog.example.com/feed").unwrap()
    }

    fn item(title: &str, link: &str, published: Option<DateTime<Utc>>) -> String {
        let date = published
            .map(|p| format!("<pubDate>{}</pubDate>", p.to_rfc2822()))
            .unwrap_or_default();
        format!("<item><title>{title}</title><link>{link}</link>{date}</item>")
    }

    fn rss(items: &[String]) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Example</title><link>https://blog.example.com</link>
<description>Example feed</description>{}</channel></rss>"#,
            items.concat()
        )
    }

    fn parse(xml: &str) -> Feed {
        parser::parse(xml.as_bytes()).unwrap()
    }

    #[test]
    fn test_filters_by_window_in_feed_order() {
        let xml = rss(&[
            item("Older", "https://blog.example.com/older", Some(now() - Duration::days(10))),
            item("Recent", "https://blog.example.com/recent", Some(now() - Duration::days(2))),
            item("Newest", "https://blog.example.com/newest", Some(now() - Duration::hours(1))),
        ]);
        let articles =
            normalize_feed(&parse(&xml), &base(), cutoff(now(), 7), now(), EntryPolicy::Strict).unwrap();

        let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Recent", "Newest"]);
        assert_eq!(articles[0].date_label(), "2026-10-16");
        assert_eq!(articles[0].link, "https://blog.example.com/recent");
        assert!(articles.iter().all(|a| a.summary.is_none()));
    }

    #[test]
    fn test_entry_exactly_at_cutoff_is_included() {
        let boundary = cutoff(now(), 7);
        let xml = rss(&[
            item("Boundary", "https://blog.example.com/b", Some(boundary)),
            item("Just before", "https://blog.example.com/x", Some(boundary - Duration::seconds(1))),
        ]);
        let articles =
            normalize_feed(&parse(&xml), &base(), boundary, now(), EntryPolicy::Strict).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Boundary");
    }

    #[test]
    fn test_window_widening_is_monotonic() {
        let xml = rss(&[
            item("A", "https://blog.example.com/a", Some(now() - Duration::minutes(5))),
            item("B", "https://blog.example.com/b", Some(now() - Duration::days(3))),
            item("C", "https://blog.example.com/c", Some(now() - Duration::days(30))),
        ]);
        let feed = parse(&xml);
        let narrow = normalize_feed(&feed, &base(), cutoff(now(), 0), now(), EntryPolicy::Strict).unwrap();
        for days in [0, 1, 7, 365] {
            let wide =
                normalize_feed(&feed, &base(), cutoff(now(), days), now(), EntryPolicy::Strict).unwrap();
            assert!(narrow.iter().all(|a| wide.contains(a)), "days={days}");
        }
        assert!(narrow.is_empty());
    }

    #[test]
    fn test_future_entries_are_dated_today() {
        let xml = rss(&[item(
            "Scheduled",
            "https://blog.example.com/s",
            Some(now() + Duration::days(3)),
        )]);
        let articles =
            normalize_feed(&parse(&xml), &base(), cutoff(now(), 7), now(), EntryPolicy::Strict).unwrap();
        assert_eq!(articles.len(), 1);
        assert!(articles[0].published <= now().date_naive());
    }

    #[test]
    fn test_missing_date_is_malformed_under_strict() {
        let xml = rss(&[
            item("Good", "https://blog.example.com/g", Some(now())),
            item("No date", "https://blog.example.com/n", None),
        ]);
        let err = normalize_feed(&parse(&xml), &base(), cutoff(now(), 7), now(), EntryPolicy::Strict)
            .unwrap_err();
        match err {
            FeedError::MalformedEntry { index, missing } => {
                assert_eq!(index, 1);
                assert_eq!(missing, vec!["published"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_date_is_dropped_under_skip() {
        let xml = rss(&[
            item("Good", "https://blog.example.com/g", Some(now())),
            item("No date", "https://blog.example.com/n", None),
        ]);
        let articles =
            normalize_feed(&parse(&xml), &base(), cutoff(now(), 7), now(), EntryPolicy::Skip).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Good");
    }

    #[test]
    fn test_relative_links_are_resolved() {
        let xml = rss(&[item("Rel", "/posts/rel", Some(now()))]);
        let articles =
            normalize_feed(&parse(&xml), &base(), cutoff(now(), 7), now(), EntryPolicy::Strict).unwrap();
        assert_eq!(articles[0].link, "https://blog.example.com/posts/rel");
    }

    #[tokio::test]
    async fn test_fetch_recent_articles_empty_feed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/feed")
            .with_status(200)
            .with_header("content-type", "application/rss+xml")
            .with_body(rss(&[]))
            .create_async()
            .await;

        let client = Client::new();
        let url = format!("{}/feed", server.url());
        let articles = fetch_recent_articles(&client, &url, 7, now(), EntryPolicy::Strict)
            .await
            .unwrap();
        assert!(articles.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_recent_articles_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/feed")
            .with_status(503)
            .create_async()
            .await;

        let client = Client::new();
        let url = format!("{}/feed", server.url());
        let err = fetch_recent_articles(&client, &url, 7, now(), EntryPolicy::Strict)
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Status { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_fetch_recent_articles_unparseable_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/feed")
            .with_status(200)
            .with_body("this is not a feed")
            .create_async()
            .await;

        let client = Client::new();
        let url = format!("{}/feed", server.url());
        let err = fetch_recent_articles(&client, &url, 7, now(), EntryPolicy::Strict)
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)));
    }
}
