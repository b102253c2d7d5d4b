//! `bfetch check` – hash-checked single download.

use anyhow::{Context, Result};
use bfetch_core::config::FetchConfig;
use bfetch_core::engine::TransferOutcome;
use std::path::PathBuf;

use super::batch::run_engine;

pub async fn run_check(
    cfg: &FetchConfig,
    url: &str,
    expected_sha1: &str,
    dest_dir: Option<PathBuf>,
) -> Result<()> {
    let dest_dir = match dest_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("reading current directory")?,
    };
    let url = url.to_string();
    let expected = expected_sha1.to_string();
    let (result, _) = run_engine(cfg, move |engine, counters| {
        engine.fetch_checked(&url, &dest_dir, &expected, counters)
    })
    .await?;
    match result? {
        TransferOutcome::Completed { bytes } => tracing::debug!(bytes, "check: downloaded"),
        TransferOutcome::Skipped => tracing::debug!("check: up to date"),
        TransferOutcome::Failed(reason) => anyhow::bail!("download failed: {}", reason),
    }
    Ok(())
}
