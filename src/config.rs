//! Run configuration and the source registry.
//!
//! Everything a component needs (credentials, endpoints, window, timeouts) is
//! collected once into [`Config`] and passed down explicitly; nothing below
//! `main` reads the environment.

use crate::cli::RunOptions;
use serde::Deserialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

/// LINE Messaging API push endpoint.
pub const LINE_PUSH_ENDPOINT: &str = "https://api.line.me/v2/bot/message/push";

/// A named syndication feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

/// The page scraped with date-label heuristics.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScrapeTarget {
    pub name: String,
    pub url: String,
}

/// The fixed set of sources collected on every run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceRegistry {
    pub feeds: Vec<FeedSource>,
    pub scrape: ScrapeTarget,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        let feed = |name: &str, url: &str| FeedSource {
            name: name.to_string(),
            url: url.to_string(),
        };
        Self {
            feeds: vec![
                feed("Lenny's Newsletter", "https://www.lennysnewsletter.com/feed"),
                feed("SVPG", "https://www.svpg.com/feed/"),
                feed("Intercom Blog", "https://www.intercom.com/blog/feed/"),
                feed("Andrew Chen", "https://andrewchen.substack.com/feed"),
            ],
            scrape: ScrapeTarget {
                name: "Mind the Product".to_string(),
                url: "https://www.mindtheproduct.com".to_string(),
            },
        }
    }
}

impl SourceRegistry {
    /// Parse a registry from YAML and validate every URL.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, Box<dyn Error>> {
        let registry: SourceRegistry = serde_yaml::from_str(yaml)?;
        registry.validate()?;
        Ok(registry)
    }

    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn from_yaml_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let yaml = tokio::fs::read_to_string(path).await?;
        let registry = Self::from_yaml_str(&yaml)?;
        info!(
            feeds = registry.feeds.len(),
            scrape = %registry.scrape.name,
            "Loaded source registry"
        );
        Ok(registry)
    }

    /// Source names in the order their results are reported.
    pub fn source_names(&self) -> Vec<&str> {
        self.feeds
            .iter()
            .map(|f| f.name.as_str())
            .chain(std::iter::once(self.scrape.name.as_str()))
            .collect()
    }

    fn validate(&self) -> Result<(), Box<dyn Error>> {
        let urls = self
            .feeds
            .iter()
            .map(|f| (&f.name, &f.url))
            .chain(std::iter::once((&self.scrape.name, &self.scrape.url)));
        for (name, url) in urls {
            if name.trim().is_empty() {
                return Err(format!("source with url {url} has an empty name").into());
            }
            let parsed = Url::parse(url).map_err(|e| format!("source {name}: invalid url {url}: {e}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(format!("source {name}: unsupported scheme in {url}").into());
            }
        }
        Ok(())
    }
}

/// Text-generation backend settings. No key means summaries are disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
}

/// LINE push settings. Both values must be present for a push to happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineConfig {
    pub token: Option<String>,
    pub group_id: Option<String>,
    pub endpoint: String,
}

/// Complete configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub days: i64,
    pub output_dir: PathBuf,
    pub http_timeout: Duration,
    pub concurrency: usize,
    pub notify: bool,
    pub llm: LlmConfig,
    pub line: LineConfig,
    pub registry: SourceRegistry,
}

impl Config {
    /// Build the run configuration from parsed CLI options and a registry.
    pub fn from_options(options: &RunOptions, registry: SourceRegistry) -> Self {
        Self {
            days: options.days.max(0),
            output_dir: options.output_dir.clone(),
            http_timeout: Duration::from_secs(options.timeout_secs.max(1)),
            concurrency: options.concurrency.max(1),
            notify: !options.no_notify,
            llm: LlmConfig {
                api_key: non_blank(options.openai_api_key.as_deref()),
                endpoint: options.openai_base_url.clone(),
                model: options.openai_model.clone(),
            },
            line: LineConfig {
                token: non_blank(options.line_token.as_deref()),
                group_id: non_blank(options.line_group_id.as_deref()),
                endpoint: LINE_PUSH_ENDPOINT.to_string(),
            },
            registry,
        }
    }
}

/// Treat unset and whitespace-only values the same.
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
