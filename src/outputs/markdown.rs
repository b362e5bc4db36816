//! Document form of the digest.
//!
//! One section per source in registry order: a date/title table followed by a
//! bold-title block for every article that carries a summary. Sources that
//! failed or had nothing recent get a one-line notice instead of a table.

use crate::models::{Article, Digest};
use std::fmt::Write;

/// Render a [`Digest`] as Markdown.
pub fn digest_to_markdown(digest: &Digest) -> String {
    let mut md = String::new();
    writeln!(md, "# 文章摘要 - {}\n", digest.run_date_label()).unwrap();

    for (source, outcome) in digest.results.iter() {
        writeln!(md, "## {source}").unwrap();

        let articles = outcome.articles();
        if articles.is_empty() {
            writeln!(md, "{}\n", empty_notice(digest.days)).unwrap();
            continue;
        }

        md.push_str("| 日期 | 標題 |\n|------|------|\n");
        for article in articles {
            writeln!(
                md,
                "| {} | [{}]({}) |",
                article.date_label(),
                escape_cell(&article.title),
                article.link
            )
            .unwrap();
        }
        md.push('\n');

        for article in articles.iter().filter(|a| a.summary.is_some()) {
            write_summary_block(&mut md, article);
        }
    }

    md
}

/// Notice shown for a source with nothing to list.
pub fn empty_notice(days: i64) -> String {
    format!("最近 {days} 天沒有新文章。")
}

fn write_summary_block(md: &mut String, article: &Article) {
    if let Some(summary) = &article.summary {
        writeln!(md, "**{}**\n{}\n", article.title, summary).unwrap();
    }
}

/// Pipes would split a table cell.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SourceOutcome, SourceResults};
    use chrono::NaiveDate;

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn test_empty_results_show_notice_per_source() {
        let results: SourceResults = [
            ("SVPG".to_string(), SourceOutcome::Fetched(vec![])),
            ("Mind the Product".to_string(), SourceOutcome::failed("HTTP 503")),
        ]
        .into_iter()
        .collect();
        let md = digest_to_markdown(&Digest::new(run_date(), 7, results));

        assert!(md.starts_with("# 文章摘要 - 2026-10-18\n"));
        assert!(md.contains("## SVPG\n最近 7 天沒有新文章。\n"));
        assert!(md.contains("## Mind the Product\n最近 7 天沒有新文章。\n"));
        assert!(!md.contains("| 日期 | 標題 |"));
        assert!(!md.contains("HTTP 503"));
    }

    #[test]
    fn test_summarised_article_has_row_and_block() {
        let article = Article::new(
            "Test Article",
            "https://example.com",
            NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
        )
        .with_summary(Some("Test summary".to_string()));
        let results: SourceResults = [("SVPG".to_string(), SourceOutcome::Fetched(vec![article]))]
            .into_iter()
            .collect();
        let md = digest_to_markdown(&Digest::new(run_date(), 7, results));

        assert!(md.contains("| 日期 | 標題 |\n|------|------|\n"));
        assert!(md.contains("| 2026-10-15 | [Test Article](https://example.com) |"));
        assert!(md.contains("**Test Article**\nTest summary\n"));
    }

    #[test]
    fn test_unsummarised_articles_only_in_table() {
        let articles = vec![
            Article::new("First", "https://a.example/1", run_date()),
            Article::new("Second | Part two", "https://a.example/2", run_date())
                .with_summary(Some("Only this one.".to_string())),
        ];
        let results: SourceResults = [("Feed".to_string(), SourceOutcome::Fetched(articles))]
            .into_iter()
            .collect();
        let md = digest_to_markdown(&Digest::new(run_date(), 3, results));

        assert!(md.contains("| 2026-10-18 | [First](https://a.example/1) |"));
        assert!(md.contains("[Second \\| Part two](https://a.example/2)"));
        assert!(!md.contains("**First**"));
        assert!(md.contains("**Second | Part two**\nOnly this one.\n"));
    }

    #[test]
    fn test_sections_follow_registry_order() {
        let results: SourceResults = ["Zeta", "Alpha", "Mid"]
            .into_iter()
            .map(|name| (name.to_string(), SourceOutcome::Fetched(vec![])))
            .collect();
        let md = digest_to_markdown(&Digest::new(run_date(), 7, results));

        let zeta = md.find("## Zeta").unwrap();
        let alpha = md.find("## Alpha").unwrap();
        let mid = md.find("## Mid").unwrap();
        assert!(zeta < alpha && alpha < mid);
    }
}
