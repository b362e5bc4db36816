//! String and file system helpers shared across the pipeline.

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Truncate a string for logging purposes.
///
/// Long strings are cut after `max` characters and get a `"…(+N bytes)"`
/// suffix telling how much was dropped.
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…(+{} bytes)", &s[..idx], s.len() - idx),
        None => s.to_string(),
    }
}

/// Keep at most `max` characters of `s`, cutting on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Cap `s` at `max` characters in total, ending with `marker` when cut.
///
/// The marker counts toward the limit, so the result never exceeds `max`.
pub fn truncate_with_marker(s: &str, max: usize, marker: &str) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(marker.chars().count());
    let mut out = truncate_chars(s, keep).trim_end().to_string();
    out.push_str(marker);
    truncate_chars(&out, max).to_string()
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
///
/// # Arguments
///
/// * `path` - The output directory the digest will be written to
///
/// # Returns
///
/// `Ok(())` when a file could be created inside `path`. A probe file that
/// cannot be removed afterwards is logged but does not fail the check.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            remove_probe(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Remove the write probe, returning whether it is gone.
fn remove_probe(probe_path: &Path) -> bool {
    match stdfs::remove_file(probe_path) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %probe_path.display(), error = %e, "Could not remove write probe");
            false
        }
    }
}
