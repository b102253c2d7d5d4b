//! `bfetch fetch` – run a manifest file.

use anyhow::{Context, Result};
use bfetch_core::config::FetchConfig;
use bfetch_core::manifest::Manifest;
use std::path::Path;

use super::batch::run_manifest;

pub async fn run_fetch(cfg: &FetchConfig, manifest_path: &Path, dest: Option<&Path>) -> Result<()> {
    let mut manifest = Manifest::load(manifest_path)
        .with_context(|| format!("loading manifest {}", manifest_path.display()))?;
    if let Some(dest) = dest {
        manifest.destination_root = Some(dest.to_path_buf());
    }
    run_manifest(cfg, manifest).await
}
