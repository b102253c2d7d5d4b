//! Declarative description of a batch: what to fetch and where to put it.
//!
//! A manifest is either built in code with the consuming builder methods or
//! loaded from a `.toml` / `.json` file:
//!
//! ```toml
//! source_base_url = "https://github.com/erincatto/box2d/raw/main"
//! destination_root = "vendor/box2d"
//! paths = ["src/collision/b2_broad_phase.cpp", "include/box2d/box2d.h"]
//!
//! [[rename]]
//! source = "LICENSE"
//! destination = "LICENSE.box2d"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One rename entry: fetch `source` (relative to the base URL) and store it
/// as `destination` (relative to the destination root).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameEntry {
    pub source: String,
    pub destination: String,
}

/// A request to fetch N files from one base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub source_base_url: String,
    /// Where files land; the working directory when absent.
    #[serde(default)]
    pub destination_root: Option<PathBuf>,
    /// Source → destination renames, in declaration order.
    #[serde(default)]
    pub rename: Vec<RenameEntry>,
    /// Relative paths stored under the same relative name.
    #[serde(default)]
    pub paths: Vec<String>,
}

impl Manifest {
    pub fn new(source_base_url: impl Into<String>) -> Self {
        Self {
            source_base_url: source_base_url.into(),
            destination_root: None,
            rename: Vec::new(),
            paths: Vec::new(),
        }
    }

    pub fn destination_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.destination_root = Some(root.into());
        self
    }

    pub fn rename(mut self, source: impl Into<String>, destination: impl Into<String>) -> Self {
        self.rename.push(RenameEntry {
            source: source.into(),
            destination: destination.into(),
        });
        self
    }

    pub fn path(mut self, source: impl Into<String>) -> Self {
        self.paths.push(source.into());
        self
    }

    pub fn paths<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths.extend(sources.into_iter().map(Into::into));
        self
    }

    /// Total number of entries (rename entries + path entries).
    pub fn len(&self) -> usize {
        self.rename.len() + self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load a manifest file. `.json` files are parsed as JSON, anything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("read manifest {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let manifest = if is_json {
            serde_json::from_str(&data)
                .with_context(|| format!("parse JSON manifest {}", path.display()))?
        } else {
            toml::from_str(&data)
                .with_context(|| format!("parse TOML manifest {}", path.display()))?
        };
        Ok(manifest)
    }
}
