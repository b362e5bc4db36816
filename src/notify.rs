//! Push the compact digest to a LINE group.
//!
//! Delivery is best effort. Missing credentials skip the push, a rejected
//! request or a network error is reported to the caller, and nothing is
//! retried.

use crate::config::LineConfig;
use crate::outputs::compact::{MAX_COMPACT_CHARS, TRUNCATION_MARKER};
use crate::utils::{truncate_for_log, truncate_with_marker};
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use tracing::{info, instrument, warn};

/// What happened to a push attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    /// Token or destination not configured.
    Skipped,
    /// The API answered with a non-success status.
    Rejected { status: u16, body: String },
    /// The request never got an answer.
    Failed(String),
}

impl NotifyOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotifyOutcome::Sent)
    }
}

impl fmt::Display for NotifyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyOutcome::Sent => write!(f, "sent"),
            NotifyOutcome::Skipped => write!(f, "skipped (no token or group id)"),
            NotifyOutcome::Rejected { status, body } => write!(f, "rejected with {status}: {body}"),
            NotifyOutcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Debug, Clone)]
struct Credentials {
    token: String,
    group_id: String,
}

/// LINE Messaging API push client.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: Client,
    endpoint: String,
    credentials: Option<Credentials>,
}

impl Notifier {
    pub fn from_config(config: &LineConfig, client: &Client) -> Self {
        let credentials = match (&config.token, &config.group_id) {
            (Some(token), Some(group_id)) => Some(Credentials {
                token: token.clone(),
                group_id: group_id.clone(),
            }),
            _ => None,
        };
        Self {
            client: client.clone(),
            endpoint: config.endpoint.clone(),
            credentials,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Send `text` as a single text message, capped at the message limit.
    #[instrument(level = "info", skip_all, fields(chars = text.chars().count()))]
    pub async fn push(&self, text: &str) -> NotifyOutcome {
        let Some(credentials) = &self.credentials else {
            info!("LINE credentials not configured; skipping push");
            return NotifyOutcome::Skipped;
        };

        let text = truncate_with_marker(text, MAX_COMPACT_CHARS, TRUNCATION_MARKER);
        let body = PushRequest {
            to: &credentials.group_id,
            messages: [TextMessage {
                kind: "text",
                text: &text,
            }],
        };

        let response = match self
            .client
            .post(&self.endpoint)
            .bearer_auth(&credentials.token)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "LINE push request failed");
                return NotifyOutcome::Failed(e.to_string());
            }
        };

        let status = response.status();
        if status.is_success() {
            info!("Pushed digest to LINE");
            return NotifyOutcome::Sent;
        }

        let body = response.text().await.unwrap_or_default();
        warn!(
            status = status.as_u16(),
            body = %truncate_for_log(&body, 300),
            "LINE rejected the push"
        );
        NotifyOutcome::Rejected {
            status: status.as_u16(),
            body,
        }
    }
}
