//! Article summarization through an OpenAI-compatible chat API.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait for sending text to a text-generation backend
//! - [`ChatCompletions`]: `reqwest` implementation against a chat-completions endpoint
//! - [`Summarizer`]: optional backend plus the fixed summary instruction
//!
//! Summaries are strictly best effort. Without an API key the summarizer is
//! disabled and never touches the network; with one, any backend failure is
//! logged and the article simply goes without a summary. Each article gets a
//! single attempt.

use crate::config::LlmConfig;
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Fixed instruction sent with every article.
pub const SUMMARY_INSTRUCTION: &str =
    "你是一位產品管理領域的編輯。請用繁體中文，以 3 到 5 句話摘要以下文章的重點，不要加標題或項目符號。";

/// Upper bound on generated tokens per summary.
const MAX_SUMMARY_TOKENS: u32 = 400;

/// Trait for async text-generation backends.
pub trait AskAsync {
    /// The type of response returned by the backend.
    type Response;

    /// Send `text` with a system `instruction` and return the backend's reply.
    async fn ask(&self, instruction: &str, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletions {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatCompletions {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

impl AskAsync for ChatCompletions {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, instruction: &str, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instruction,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            max_tokens: MAX_SUMMARY_TOKENS,
            temperature: 0.3,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(format!("chat API returned {status}: {}", truncate_for_log(&detail, 300)).into());
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or("chat API response has no message content")?;

        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, "Chat completion received");
        Ok(content)
    }
}

/// Produces short article summaries when a backend is configured.
#[derive(Debug)]
pub struct Summarizer<A = ChatCompletions> {
    backend: Option<A>,
}

impl Summarizer<ChatCompletions> {
    /// Build from configuration; no API key yields a disabled summarizer.
    pub fn from_config(config: &LlmConfig, client: &Client) -> Self {
        let backend = config.api_key.as_ref().map(|key| {
            ChatCompletions::new(client.clone(), &config.endpoint, key, &config.model)
        });
        if backend.is_none() {
            info!("No API key configured; summaries disabled");
        }
        Self { backend }
    }
}

impl<A> Summarizer<A>
where
    A: AskAsync<Response = String>,
{
    pub fn with_backend(backend: A) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn disabled() -> Self {
        Self { backend: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Summarize one article, returning `None` when disabled or on any failure.
    ///
    /// # Arguments
    ///
    /// * `title` - Article title, included in the prompt
    /// * `content` - Extracted article text
    ///
    /// # Returns
    ///
    /// The trimmed summary, or `None` when no backend is configured, the
    /// request fails or the answer is blank. Failures are logged only.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let summarizer = Summarizer::from_config(&config.llm, &client);
    /// let summary = summarizer.summarize("Roadmaps", &text).await;
    /// ```
    #[instrument(level = "info", skip_all, fields(%title))]
    pub async fn summarize(&self, title: &str, content: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;
        let t0 = Instant::now();
        let prompt = format!("標題：{title}\n\n{content}");

        match backend.ask(SUMMARY_INSTRUCTION, &prompt).await {
            Ok(reply) => {
                let summary = reply.trim();
                if summary.is_empty() {
                    warn!("Backend returned an empty summary");
                    return None;
                }
                info!(
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    chars = summary.chars().count(),
                    "Summarized article"
                );
                Some(summary.to_string())
            }
            Err(e) => {
                warn!(
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    error = %e,
                    "Summarization failed; continuing without summary"
                );
                None
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}
