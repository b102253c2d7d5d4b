//! CLI for the bfetch batch file fetcher.

mod commands;

use anyhow::Result;
use bfetch_core::config;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use commands::{
    apply_batch_overrides, run_check, run_completions, run_fetch, run_get, run_sha1,
    BatchOverrides,
};

/// Top-level CLI for bfetch.
#[derive(Debug, Parser)]
#[command(name = "bfetch")]
#[command(about = "bfetch: fetch a batch of files from one base URL", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch every file listed in a manifest (.toml or .json).
    Fetch {
        /// Path to the manifest file.
        manifest: PathBuf,
        /// Destination root (overrides the manifest's destination_root).
        #[arg(long, value_name = "DIR")]
        dest: Option<PathBuf>,
        /// Run up to N transfers concurrently (default from config, 1 = sequential).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
        /// Attempt every item and report all failures instead of stopping at the first.
        #[arg(long)]
        keep_going: bool,
        /// Give up on transfers still pending after SECS seconds.
        #[arg(long, value_name = "SECS")]
        deadline: Option<u64>,
    },

    /// Fetch PATHs under BASE_URL without a manifest file.
    Get {
        /// Base URL every path is resolved against.
        base_url: String,
        /// Relative paths, stored under the same relative path locally.
        paths: Vec<String>,
        /// Fetch SRC but store it as DEST (repeatable).
        #[arg(long = "rename", value_name = "SRC=DEST", value_parser = parse_rename)]
        renames: Vec<(String, String)>,
        /// Destination root (default: current directory).
        #[arg(long, value_name = "DIR")]
        dest: Option<PathBuf>,
        /// Run up to N transfers concurrently.
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
        /// Attempt every item and report all failures.
        #[arg(long)]
        keep_going: bool,
    },

    /// Download URL into a directory unless a file there already has the given SHA-1.
    Check {
        /// Direct HTTP/HTTPS URL; the local file name is its last path segment.
        url: String,
        /// Expected SHA-1 (40 hex characters, any case).
        sha1: String,
        /// Directory holding the file (default: current directory).
        #[arg(long, value_name = "DIR")]
        dest_dir: Option<PathBuf>,
    },

    /// Compute SHA-1 of a file.
    Sha1 {
        /// Path to the file.
        path: PathBuf,
    },

    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Parses `SRC=DEST` for `--rename`.
fn parse_rename(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((src, dest)) if !src.is_empty() && !dest.is_empty() => {
            Ok((src.to_string(), dest.to_string()))
        }
        _ => Err(format!("expected SRC=DEST, got {:?}", raw)),
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        if let CliCommand::Completions { shell } = &cli.command {
            run_completions(*shell);
            return Ok(());
        }

        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch {
                manifest,
                dest,
                jobs,
                keep_going,
                deadline,
            } => {
                apply_batch_overrides(
                    &mut cfg,
                    &BatchOverrides {
                        jobs,
                        keep_going,
                        deadline_secs: deadline,
                    },
                );
                run_fetch(&cfg, &manifest, dest.as_deref()).await?;
            }
            CliCommand::Get {
                base_url,
                paths,
                renames,
                dest,
                jobs,
                keep_going,
            } => {
                apply_batch_overrides(
                    &mut cfg,
                    &BatchOverrides {
                        jobs,
                        keep_going,
                        deadline_secs: None,
                    },
                );
                run_get(&cfg, &base_url, paths, renames, dest).await?;
            }
            CliCommand::Check {
                url,
                sha1,
                dest_dir,
            } => run_check(&cfg, &url, &sha1, dest_dir).await?,
            CliCommand::Sha1 { path } => run_sha1(&path)?,
            CliCommand::Completions { .. } => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
