//! Command-line interface definitions for pm_digest.
//!
//! All run options can be given as flags; credentials fall back to
//! environment variables (a `.env` file in the working directory is loaded
//! before parsing).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for pm_digest.
///
/// # Examples
///
/// ```sh
/// # Full run with defaults (7-day window, ./output)
/// pm_digest
///
/// # Preflight checks only
/// pm_digest check
///
/// # Two-week window, custom sources, no chat push
/// pm_digest run --days 14 --sources sources.yaml --no-notify
///
/// # Listen for LINE webhook callbacks to discover a group id
/// pm_digest setup --port 8765
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub options: RunOptions,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run preflight checks, collect articles, write and push the digest (default)
    Run,
    /// Run the preflight checks only
    Check,
    /// Start a temporary webhook listener that prints LINE group ids
    Setup {
        /// Port to listen on
        #[arg(long, default_value_t = 8765)]
        port: u16,
    },
}

/// Options shared by `run` and `check`.
#[derive(clap::Args, Debug, Clone)]
pub struct RunOptions {
    /// Output directory for the Markdown digest
    #[arg(short, long, global = true, default_value = "output")]
    pub output_dir: PathBuf,

    /// Recency window in days
    #[arg(short, long, global = true, default_value_t = 7)]
    pub days: i64,

    /// Optional YAML file replacing the built-in source registry
    #[arg(short, long, global = true)]
    pub sources: Option<PathBuf>,

    /// Timeout applied to every HTTP request, in seconds
    #[arg(long, global = true, default_value_t = 15)]
    pub timeout_secs: u64,

    /// Number of articles extracted and summarized at the same time
    #[arg(long, global = true, default_value_t = 4)]
    pub concurrency: usize,

    /// Skip the preflight checks before a run
    #[arg(long, global = true)]
    pub skip_preflight: bool,

    /// Do not push the digest to LINE even when credentials are present
    #[arg(long, global = true)]
    pub no_notify: bool,

    /// API key for the text-generation service (summaries are disabled without it)
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Chat-completions endpoint
    #[arg(
        long,
        global = true,
        env = "OPENAI_BASE_URL",
        default_value = "https://api.openai.com/v1/chat/completions"
    )]
    pub openai_base_url: String,

    /// Model used for summaries
    #[arg(long, global = true, env = "OPENAI_MODEL", default_value = "gpt-4o-mini")]
    pub openai_model: String,

    /// LINE Messaging API channel access token
    #[arg(long, global = true, env = "LINE_CHANNEL_ACCESS_TOKEN", hide_env_values = true)]
    pub line_token: Option<String>,

    /// LINE group id receiving the digest
    #[arg(long, global = true, env = "LINE_GROUP_ID")]
    pub line_group_id: Option<String>,
}

impl Cli {
    /// The subcommand to execute; a bare invocation means `run`.
    pub fn selected_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}
