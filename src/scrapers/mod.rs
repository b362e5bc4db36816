//! Source acquisition: syndication feeds and scraped pages.
//!
//! Every source ends up as a list of [`Article`](crate::models::Article)s:
//!
//! | Kind | Module | Method |
//! |------|--------|--------|
//! | RSS / Atom / JSON Feed | [`feed`] | `feed-rs` parsing + recency filter |
//! | HTML page | [`page`] | date-label heuristics + nearest-link resolution |
//!
//! Both paths make a single attempt per source; callers turn failures into
//! [`SourceOutcome::Failed`](crate::models::SourceOutcome::Failed) so one
//! broken source never aborts the run.

pub mod feed;
pub mod page;

use reqwest::Client;
use std::time::Duration;

/// User agent sent with every request. Some sites reject non-browser agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; pm_digest/0.1)";

/// Build the HTTP client shared by all network calls in a run.
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}
