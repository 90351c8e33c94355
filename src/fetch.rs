//! Downloads a fresh copy of the taxonomy.
//!
//! One request, one timeout, no retries: a failed fetch aborts the build and
//! leaves the previous local copy untouched.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::time::Duration;

/// Fetches `url` into `dest`, returning the number of bytes written.
pub async fn fetch_taxonomy(url: &str, dest: &Path, timeout: Duration) -> Result<usize> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;

    let status = resp.status();
    if !status.is_success() {
        bail!("Fetching {} returned HTTP {}", url, status);
    }

    let body = resp
        .bytes()
        .await
        .with_context(|| format!("Failed to read response body from {}", url))?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // Staged in a sibling file; `dest` only changes on the rename.
    let partial = dest.with_extension("partial");
    std::fs::write(&partial, &body)
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    std::fs::rename(&partial, dest)
        .with_context(|| format!("Failed to move fetched taxonomy to {}", dest.display()))?;

    Ok(body.len())
}
