//! Compact plain-text form of the digest, sized for a chat message.

use crate::models::Digest;
use crate::utils::truncate_with_marker;

/// Longest compact digest, in characters.
pub const MAX_COMPACT_CHARS: usize = 5000;

/// Appended when the compact digest is cut.
pub const TRUNCATION_MARKER: &str = "…";

/// Sent when no source produced anything.
pub const NOTHING_TODAY: &str = "今天沒有新文章。";

const DIVIDER: &str = "──────────";

/// Render a [`Digest`] as compact text.
///
/// Sources without articles are left out entirely. The result never exceeds
/// [`MAX_COMPACT_CHARS`].
pub fn digest_to_compact(digest: &Digest) -> String {
    let sections: Vec<String> = digest
        .results
        .iter()
        .filter(|(_, outcome)| !outcome.articles().is_empty())
        .map(|(source, outcome)| {
            let mut lines = vec![format!("【{source}】")];
            for article in outcome.articles() {
                lines.push(format!("▸ {}", article.title));
                if let Some(summary) = &article.summary {
                    lines.push(summary.clone());
                }
                lines.push(format!("🔗 {}", article.link));
                lines.push(DIVIDER.to_string());
            }
            lines.join("\n")
        })
        .collect();

    if sections.is_empty() {
        return NOTHING_TODAY.to_string();
    }

    truncate_with_marker(&sections.join("\n\n"), MAX_COMPACT_CHARS, TRUNCATION_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, SourceOutcome, SourceResults};
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn digest(results: SourceResults) -> Digest {
        Digest::new(day(), 7, results)
    }

    #[test]
    fn test_nothing_today_when_every_source_is_empty() {
        let results: SourceResults = [
            ("SVPG".to_string(), SourceOutcome::Fetched(vec![])),
            ("Mind the Product".to_string(), SourceOutcome::failed("timeout")),
        ]
        .into_iter()
        .collect();
        assert_eq!(digest_to_compact(&digest(results)), NOTHING_TODAY);
        assert_eq!(digest_to_compact(&digest(SourceResults::new())), NOTHING_TODAY);
    }

    #[test]
    fn test_summarised_article_lines() {
        let article = Article::new("Test Article", "https://example.com", day())
            .with_summary(Some("Test summary".to_string()));
        let results: SourceResults = [
            ("Empty".to_string(), SourceOutcome::Fetched(vec![])),
            ("SVPG".to_string(), SourceOutcome::Fetched(vec![article])),
        ]
        .into_iter()
        .collect();
        let text = digest_to_compact(&digest(results));

        assert_eq!(
            text,
            "【SVPG】\n▸ Test Article\nTest summary\n🔗 https://example.com\n──────────"
        );
        assert!(!text.contains("Empty"));
    }

    #[test]
    fn test_article_without_summary_has_no_summary_line() {
        let article = Article::new("Bare", "https://example.com/bare", day());
        let results: SourceResults = [("Feed".to_string(), SourceOutcome::Fetched(vec![article]))]
            .into_iter()
            .collect();
        assert_eq!(
            digest_to_compact(&digest(results)),
            "【Feed】\n▸ Bare\n🔗 https://example.com/bare\n──────────"
        );
    }

    #[test]
    fn test_long_digest_is_capped_with_marker() {
        let articles: Vec<Article> = (0..200)
            .map(|i| {
                Article::new(format!("Article {i}"), format!("https://example.com/{i}"), day())
                    .with_summary(Some("摘要".repeat(20)))
            })
            .collect();
        let results: SourceResults = [("Feed".to_string(), SourceOutcome::Fetched(articles))]
            .into_iter()
            .collect();
        let text = digest_to_compact(&digest(results));

        assert!(text.chars().count() <= MAX_COMPACT_CHARS);
        assert!(text.ends_with(TRUNCATION_MARKER));
        assert!(text.starts_with("【Feed】\n▸ Article 0\n"));
    }

    #[test]
    fn test_short_digest_is_not_marked() {
        let article = Article::new("One", "https://example.com/1", day());
        let results: SourceResults = [("Feed".to_string(), SourceOutcome::Fetched(vec![article]))]
            .into_iter()
            .collect();
        assert!(!digest_to_compact(&digest(results)).ends_with(TRUNCATION_MARKER));
    }
}
