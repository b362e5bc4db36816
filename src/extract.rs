//! Best-effort article body extraction.
//!
//! Fetches an article page and returns its readable text, or `None` when the
//! page cannot be fetched or holds no text. Failures are logged and never
//! propagate, so a bad article only loses its summary.

use crate::utils::truncate_chars;
use itertools::Itertools;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};

/// Upper bound on extracted text, in characters.
pub const MAX_CONTENT_CHARS: usize = 5000;

/// Elements whose text is never part of the article body.
const BOILERPLATE: [&str; 6] = ["script", "style", "nav", "header", "footer", "noscript"];

static ARTICLE: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

/// Fetch `url` and extract its body text.
///
/// # Arguments
///
/// * `client` - Shared HTTP client
/// * `url` - Article page to read
///
/// # Returns
///
/// At most [`MAX_CONTENT_CHARS`] characters of readable text, or `None` when
/// the fetch fails, the status is not a success or the page has no text.
#[instrument(level = "info", skip(client))]
pub async fn extract_content(client: &Client, url: &str) -> Option<String> {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "Article fetch failed");
            return None;
        }
    };
    if !response.status().is_success() {
        warn!(status = %response.status(), "Article fetch returned non-success status");
        return None;
    }
    let html = match response.text().await {
        Ok(html) => html,
        Err(e) => {
            warn!(error = %e, "Could not read article body");
            return None;
        }
    };

    let text = extract_text(&html);
    match &text {
        Some(t) => debug!(chars = t.chars().count(), "Extracted article text"),
        None => debug!("Article page had no readable text"),
    }
    text
}

/// Extract readable text from an HTML document.
///
/// The first `<article>` outside any boilerplate element is preferred; when
/// there is none, or it holds no text, `<body>` is used instead. Text under
/// boilerplate elements is dropped, remaining text nodes are trimmed and
/// joined with newlines, and the result is capped at [`MAX_CONTENT_CHARS`].
///
/// # Examples
///
/// ```ignore
/// let html = "<body><header><article>Promo</article></header><p>Story.</p></body>";
/// assert_eq!(extract_text(html).as_deref(), Some("Story."));
/// ```
pub fn extract_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let article = document
        .select(&ARTICLE)
        .find(|el| !in_boilerplate(*el))
        .and_then(readable_text);
    let text = article.or_else(|| document.select(&BODY).next().and_then(readable_text))?;

    Some(truncate_chars(&text, MAX_CONTENT_CHARS).to_string())
}

/// Whether `el` is, or sits inside, a boilerplate element.
fn in_boilerplate(el: ElementRef<'_>) -> bool {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .any(|el| BOILERPLATE.contains(&el.value().name()))
}

/// Trimmed non-boilerplate text under `root`, or `None` when there is none.
fn readable_text(root: ElementRef<'_>) -> Option<String> {
    let text = root
        .descendants()
        .filter(|node| !node.parent().and_then(ElementRef::wrap).is_some_and(in_boilerplate))
        .filter_map(|node| node.value().as_text())
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .join("\n");
    (!text.is_empty()).then_some(text)
}
