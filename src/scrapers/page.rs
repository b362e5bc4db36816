//! Heuristic scraper for pages that list articles without a feed.
//!
//! The page is scanned for short `MON D` date labels (for example `JAN 5`).
//! Each label is turned into a dated article by two swappable heuristics:
//!
//! 1. **label → candidate date**: the year is not printed, so the current year
//!    is assumed and moved back one year when that would put the date in the
//!    future.
//! 2. **date element → nearest article link**: climb at most
//!    [`MAX_ANCESTOR_DEPTH`] ancestors and take the first `<a>` whose `href`
//!    starts with `/` and a lowercase letter.
//!
//! The first ancestor level holding a qualifying link ends the search for that
//! label. When that link was already claimed by an earlier label the label
//! yields nothing, even if an outer ancestor holds another link.

use crate::models::Article;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// How many ancestor levels are searched for an article link.
pub const MAX_ANCESTOR_DEPTH: usize = 10;

/// Title fragments must be longer than this (in characters) to be preferred.
const MIN_TITLE_FRAGMENT_CHARS: usize = 20;

const MONTHS: [(&str, u32); 12] = [
    ("JAN", 1),
    ("FEB", 2),
    ("MAR", 3),
    ("APR", 4),
    ("MAY", 5),
    ("JUN", 6),
    ("JUL", 7),
    ("AUG", 8),
    ("SEP", 9),
    ("OCT", 10),
    ("NOV", 11),
    ("DEC", 12),
];

static DATE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC)\s+(\d{1,2})$").unwrap()
});
static ARTICLE_HREF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/[a-z]").unwrap());
static LABEL_ELEMENTS: Lazy<Selector> = Lazy::new(|| Selector::parse("div").unwrap());

/// Failures while fetching the scraped page.
#[derive(Debug)]
pub enum ScrapeError {
    InvalidUrl(url::ParseError),
    Http(reqwest::Error),
    Status { status: StatusCode, url: String },
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeError::InvalidUrl(e) => write!(f, "invalid page url: {e}"),
            ScrapeError::Http(e) => write!(f, "page request failed: {e}"),
            ScrapeError::Status { status, url } => write!(f, "page {url} answered {status}"),
        }
    }
}

impl Error for ScrapeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ScrapeError::InvalidUrl(e) => Some(e),
            ScrapeError::Http(e) => Some(e),
            ScrapeError::Status { .. } => None,
        }
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self {
        ScrapeError::Http(e)
    }
}

impl From<url::ParseError> for ScrapeError {
    fn from(e: url::ParseError) -> Self {
        ScrapeError::InvalidUrl(e)
    }
}

/// Site-specific pieces of the scraping heuristic.
///
/// [`parse_page`] drives the walk (window filter, dedup, link resolution);
/// implementors decide what a date label looks like, which date it denotes,
/// where its article link lives and how the title is read.
pub trait ScrapeHeuristic {
    /// Elements carrying a date label, with their label text, in document order.
    fn date_labels<'a>(&self, document: &'a Html) -> Vec<(ElementRef<'a>, String)>;

    /// The single date a label denotes relative to `now`, if it is a valid date.
    fn candidate_date(&self, label: &str, now: DateTime<Utc>) -> Option<NaiveDate>;

    /// The article link belonging to a label element.
    fn nearest_article_link<'a>(&self, label: ElementRef<'a>) -> Option<ElementRef<'a>>;

    /// Display title read from an article link.
    fn title(&self, link: ElementRef<'_>) -> String;
}

/// Heuristic for listings printing upper-case `MON D` labels in their own `<div>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonthDayLabels;

impl MonthDayLabels {
    pub fn is_date_label(text: &str) -> bool {
        DATE_LABEL.is_match(text)
    }
}

impl ScrapeHeuristic for MonthDayLabels {
    fn date_labels<'a>(&self, document: &'a Html) -> Vec<(ElementRef<'a>, String)> {
        document
            .select(&LABEL_ELEMENTS)
            .filter_map(|element| {
                let text = sole_text(element)?.trim().to_string();
                Self::is_date_label(&text).then_some((element, text))
            })
            .collect()
    }

    fn candidate_date(&self, label: &str, now: DateTime<Utc>) -> Option<NaiveDate> {
        let caps = DATE_LABEL.captures(label)?;
        let month = MONTHS
            .iter()
            .find(|(name, _)| *name == &caps[1])
            .map(|(_, number)| *number)?;
        let day: u32 = caps[2].parse().ok()?;

        let this_year = NaiveDate::from_ymd_opt(now.year(), month, day)?;
        if this_year.and_time(NaiveTime::MIN).and_utc() > now {
            NaiveDate::from_ymd_opt(now.year() - 1, month, day)
        } else {
            Some(this_year)
        }
    }

    fn nearest_article_link<'a>(&self, label: ElementRef<'a>) -> Option<ElementRef<'a>> {
        label
            .ancestors()
            .take(MAX_ANCESTOR_DEPTH)
            .find_map(|ancestor| {
                ancestor
                    .descendants()
                    .skip(1)
                    .filter_map(ElementRef::wrap)
                    .find(|el| {
                        el.value().name() == "a"
                            && el
                                .value()
                                .attr("href")
                                .is_some_and(|href| ARTICLE_HREF.is_match(href))
                    })
            })
    }

    fn title(&self, link: ElementRef<'_>) -> String {
        let fragments: Vec<&str> = link
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();

        fragments
            .join("|")
            .split('|')
            .find(|fragment| {
                fragment.chars().count() > MIN_TITLE_FRAGMENT_CHARS
                    && !Self::is_date_label(fragment)
            })
            .map(str::to_string)
            .unwrap_or_else(|| fragments.concat())
    }
}

/// Text of an element whose only content is a single text node, possibly
/// wrapped in single-child elements.
fn sole_text<'a>(element: ElementRef<'a>) -> Option<&'a str> {
    let mut node = *element;
    loop {
        let mut children = node.children();
        let only = children.next()?;
        if children.next().is_some() {
            return None;
        }
        match only.value() {
            Node::Text(text) => return Some(&**text),
            Node::Element(_) => node = only,
            _ => return None,
        }
    }
}

/// Extract dated articles from a listing page.
///
/// Labels dated before `cutoff` or naming impossible dates are skipped. Links
/// are resolved against `base` and unique within one call, first label wins.
pub fn parse_page<H: ScrapeHeuristic>(
    html: &str,
    base: &Url,
    now: DateTime<Utc>,
    cutoff: DateTime<Utc>,
    heuristic: &H,
) -> Vec<Article> {
    let document = Html::parse_document(html);
    let mut seen: HashSet<String> = HashSet::new();
    let mut articles = Vec::new();

    for (label, text) in heuristic.date_labels(&document) {
        let Some(published) = heuristic.candidate_date(&text, now) else {
            debug!(label = %text, "Skipping label with impossible date");
            continue;
        };
        if published.and_time(NaiveTime::MIN).and_utc() < cutoff {
            continue;
        }

        let Some(link) = heuristic.nearest_article_link(label) else {
            debug!(label = %text, "No article link near label");
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let absolute = match base.join(href) {
            Ok(url) => url,
            Err(e) => {
                warn!(%href, error = %e, "Could not resolve article link");
                continue;
            }
        };
        // Dedup on the resolved link: distinct hrefs may normalize to one URL.
        if !seen.insert(absolute.as_str().to_string()) {
            debug!(label = %text, link = %absolute, "Link already claimed by an earlier label");
            continue;
        }

        let title = heuristic.title(link);
        if title.is_empty() {
            warn!(%href, "Article link has no text; skipping");
            continue;
        }

        articles.push(Article::new(title, absolute.to_string(), published));
    }

    articles
}

/// Fetch `page_url` and return the articles labelled within the last `days` days.
///
/// A non-2xx answer or network error is a hard failure for this source.
///
/// # Arguments
///
/// * `client` - Shared HTTP client
/// * `page_url` - Listing page; article links are resolved against it
/// * `days` - Recency window applied to the inferred label dates
/// * `now` - Reference instant for year inference and the window
/// * `heuristic` - Site-specific label and link rules, usually [`MonthDayLabels`]
///
/// # Returns
///
/// Articles in label order with unique links, or a [`ScrapeError`].
///
/// # Example
///
/// ```ignore
/// let articles = scrape_recent_articles(&client, "https://www.mindtheproduct.com", 7, Utc::now(), &MonthDayLabels).await?;
/// ```
#[instrument(level = "info", skip(client, now, heuristic))]
pub async fn scrape_recent_articles<H: ScrapeHeuristic>(
    client: &Client,
    page_url: &str,
    days: i64,
    now: DateTime<Utc>,
    heuristic: &H,
) -> Result<Vec<Article>, ScrapeError> {
    let base = Url::parse(page_url)?;
    let response = client.get(base.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::Status {
            status,
            url: page_url.to_string(),
        });
    }
    let html = response.text().await?;

    let articles = parse_page(
        &html,
        &base,
        now,
        crate::scrapers::feed::cutoff(now, days),
        heuristic,
    );
    info!(count = articles.len(), days, "Scraped recent page articles");
    Ok(articles)
}
