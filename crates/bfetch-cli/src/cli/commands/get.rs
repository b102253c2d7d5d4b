//! `bfetch get` – build a manifest from the command line and run it.

use anyhow::Result;
use bfetch_core::config::FetchConfig;
use bfetch_core::manifest::Manifest;
use std::path::PathBuf;

use super::batch::run_manifest;

pub async fn run_get(
    cfg: &FetchConfig,
    base_url: &str,
    paths: Vec<String>,
    renames: Vec<(String, String)>,
    dest: Option<PathBuf>,
) -> Result<()> {
    run_manifest(cfg, inline_manifest(base_url, paths, renames, dest)).await
}

fn inline_manifest(
    base_url: &str,
    paths: Vec<String>,
    renames: Vec<(String, String)>,
    dest: Option<PathBuf>,
) -> Manifest {
    let mut manifest = Manifest::new(base_url).paths(paths);
    for (src, target) in renames {
        manifest = manifest.rename(src, target);
    }
    if let Some(dest) = dest {
        manifest = manifest.destination_root(dest);
    }
    manifest
}
