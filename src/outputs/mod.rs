//! Digest rendering and the on-disk output file.
//!
//! # Submodules
//!
//! - [`markdown`]: document form written to disk
//! - [`compact`]: plain-text form pushed to the chat channel
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── digest_2026-10-17.md
//! └── digest_2026-10-18.md   # rewritten on every run that day
//! ```

pub mod compact;
pub mod markdown;

use crate::models::Digest;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Path of the digest file for the digest's run date.
pub fn digest_path(output_dir: &Path, digest: &Digest) -> PathBuf {
    output_dir.join(format!("digest_{}.md", digest.run_date_label()))
}

/// Render `digest` as Markdown and write it under `output_dir`.
///
/// Creates the directory when missing and overwrites an existing file for the
/// same date.
///
/// # Arguments
///
/// * `output_dir` - Directory holding the digests
/// * `digest` - The finished digest; its run date names the file
///
/// # Returns
///
/// The path of the written `digest_YYYY-MM-DD.md`, or the I/O error.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_digest(output_dir: &Path, digest: &Digest) -> Result<PathBuf, Box<dyn Error>> {
    let md = markdown::digest_to_markdown(digest);

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(error = %e, "Failed to create output dir");
        return Err(e.into());
    }

    let path = digest_path(output_dir, digest);
    fs::write(&path, md).await?;
    info!(path = %path.display(), "Wrote digest Markdown");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, SourceOutcome, SourceResults};
    use chrono::NaiveDate;

    fn digest_with(title: &str) -> Digest {
        let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let results: SourceResults = [(
            "SVPG".to_string(),
            SourceOutcome::Fetched(vec![Article::new(title, "https://example.com", day)]),
        )]
        .into_iter()
        .collect();
        Digest::new(day, 7, results)
    }

    #[tokio::test]
    async fn test_write_digest_creates_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("output");

        let path = write_digest(&out, &digest_with("First")).await.unwrap();
        assert_eq!(path, out.join("digest_2026-10-18.md"));

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, markdown::digest_to_markdown(&digest_with("First")));
    }

    #[tokio::test]
    async fn test_write_digest_overwrites_same_date() {
        let dir = tempfile::tempdir().unwrap();

        write_digest(dir.path(), &digest_with("First")).await.unwrap();
        let path = write_digest(dir.path(), &digest_with("Second")).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[Second]"));
        assert!(!written.contains("[First]"));
    }
}
