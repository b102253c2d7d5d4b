//! `bfetch sha1` – print the SHA-1 of a local file.

use anyhow::{Context, Result};
use bfetch_core::checksum;
use std::path::Path;

pub fn run_sha1(path: &Path) -> Result<()> {
    let digest =
        checksum::sha1_path(path).with_context(|| format!("hashing {}", path.display()))?;
    println!("{}  {}", digest, path.display());
    Ok(())
}
