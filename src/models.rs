//! Data models shared by every acquisition path and renderer.
//!
//! - [`Article`]: the uniform record produced by feeds and scraped pages
//! - [`SourceOutcome`]: per-source result (fetched, possibly empty, or failed)
//! - [`SourceResults`]: ordered mapping of source name to outcome for one run
//! - [`Digest`]: a run date plus its results, the input to the renderers

use chrono::NaiveDate;
use serde::Serialize;

/// A single article discovered during a run.
///
/// `link` is always absolute and `published` never lies after the acquisition
/// date. `summary` is filled in later, and only when summarization produced
/// non-empty text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    /// Display title, never empty.
    pub title: String,
    /// Absolute URL of the article.
    pub link: String,
    /// Publication date (time of day is dropped).
    pub published: NaiveDate,
    /// Optional AI-generated summary.
    pub summary: Option<String>,
}

impl Article {
    pub fn new(title: impl Into<String>, link: impl Into<String>, published: NaiveDate) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            published,
            summary: None,
        }
    }

    /// Attach a summary, ignoring blank text so the non-empty invariant holds.
    pub fn with_summary(mut self, summary: Option<String>) -> Self {
        self.summary = summary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }

    /// Publication date formatted as `YYYY-MM-DD`.
    pub fn date_label(&self) -> String {
        self.published.format("%Y-%m-%d").to_string()
    }
}

/// Outcome of acquiring one source.
///
/// An empty `Fetched` means the source answered but had nothing recent;
/// `Failed` means it could not be read at all this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Fetched(Vec<Article>),
    Failed { reason: String },
}

impl SourceOutcome {
    pub fn failed(reason: impl ToString) -> Self {
        SourceOutcome::Failed {
            reason: reason.to_string(),
        }
    }

    /// Articles gathered for this source; failures contribute none.
    pub fn articles(&self) -> &[Article] {
        match self {
            SourceOutcome::Fetched(articles) => articles,
            SourceOutcome::Failed { .. } => &[],
        }
    }

    pub fn articles_mut(&mut self) -> Option<&mut Vec<Article>> {
        match self {
            SourceOutcome::Fetched(articles) => Some(articles),
            SourceOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SourceOutcome::Failed { .. })
    }
}

/// Per-run collection of source outcomes, kept in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceResults {
    entries: Vec<(String, SourceOutcome)>,
}

impl SourceResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome for `source`. A repeated name replaces the earlier
    /// outcome in place so ordering stays stable.
    pub fn insert(&mut self, source: impl Into<String>, outcome: SourceOutcome) {
        let source = source.into();
        match self.entries.iter_mut().find(|(name, _)| *name == source) {
            Some((_, existing)) => *existing = outcome,
            None => self.entries.push((source, outcome)),
        }
    }

    pub fn get(&self, source: &str) -> Option<&SourceOutcome> {
        self.entries
            .iter()
            .find(|(name, _)| name == source)
            .map(|(_, outcome)| outcome)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceOutcome)> {
        self.entries
            .iter()
            .map(|(name, outcome)| (name.as_str(), outcome))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut SourceOutcome)> {
        self.entries
            .iter_mut()
            .map(|(name, outcome)| (name.as_str(), outcome))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of articles across all sources.
    pub fn article_count(&self) -> usize {
        self.entries
            .iter()
            .map(|(_, outcome)| outcome.articles().len())
            .sum()
    }
}

impl FromIterator<(String, SourceOutcome)> for SourceResults {
    fn from_iter<I: IntoIterator<Item = (String, SourceOutcome)>>(iter: I) -> Self {
        let mut results = SourceResults::new();
        for (name, outcome) in iter {
            results.insert(name, outcome);
        }
        results
    }
}

/// Everything the renderers need for one run.
#[derive(Debug, Clone)]
pub struct Digest {
    /// The run date, used in headings and the output filename.
    pub run_date: NaiveDate,
    /// Recency window the articles were filtered with.
    pub days: i64,
    pub results: SourceResults,
}

impl Digest {
    pub fn new(run_date: NaiveDate, days: i64, results: SourceResults) -> Self {
        Self {
            run_date,
            days,
            results,
        }
    }

    pub fn run_date_label(&self) -> String {
        self.run_date.format("%Y-%m-%d").to_string()
    }
}
