//! Shared plumbing for commands that drive the engine.
//!
//! The engine is blocking, so it runs on the blocking pool while the async
//! side prints progress events and turns Ctrl-C into a cancel.

use anyhow::{Context, Result};
use bfetch_core::config::{FailurePolicy, FetchConfig};
use bfetch_core::engine::{FetchEngine, TransferOutcome};
use bfetch_core::error::BatchError;
use bfetch_core::manifest::Manifest;
use bfetch_core::progress::{CounterSnapshot, ProgressCounters, ProgressEvent};

/// Command-line overrides for the batch section of the config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOverrides {
    pub jobs: Option<usize>,
    pub keep_going: bool,
    pub deadline_secs: Option<u64>,
}

pub fn apply_batch_overrides(cfg: &mut FetchConfig, overrides: &BatchOverrides) {
    if let Some(jobs) = overrides.jobs {
        cfg.concurrency = jobs.max(1);
    }
    if overrides.keep_going {
        cfg.failure_policy = FailurePolicy::CollectAll;
    }
    if overrides.deadline_secs.is_some() {
        cfg.deadline_secs = overrides.deadline_secs;
    }
}

/// Runs `job` against a curl-backed engine on the blocking pool, printing
/// events as they arrive. Returns the job's result and the final counters.
pub async fn run_engine<T, F>(cfg: &FetchConfig, job: F) -> Result<(T, CounterSnapshot)>
where
    F: FnOnce(&FetchEngine, &ProgressCounters) -> T + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<ProgressEvent>();
    let engine = FetchEngine::from_config(cfg).with_events(tx);

    let token = engine.cancel_token().clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling pending transfers");
            eprintln!("interrupted, cancelling...");
            token.cancel();
        }
    });
    let printer = tokio::spawn(print_events(rx));

    // The engine (and with it the event sender) is dropped when the task ends,
    // which lets the printer drain and exit.
    let joined = tokio::task::spawn_blocking(move || {
        let counters = ProgressCounters::new();
        let out = job(&engine, &counters);
        (out, counters.snapshot())
    })
    .await;
    interrupt.abort();
    let _ = printer.await;
    joined.context("fetch task failed")
}

async fn print_events(mut rx: tokio::sync::mpsc::UnboundedReceiver<ProgressEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            ProgressEvent::Completed {
                url,
                completed,
                attempted,
                ..
            } => println!("[{}/{}] {}", completed, attempted, url),
            ProgressEvent::Skipped { file_name, .. } => {
                println!("skip {} (SHA1 verified)", file_name)
            }
            ProgressEvent::Failed { url, message } => eprintln!("failed {}: {}", url, message),
        }
    }
}

fn print_summary(counters: &CounterSnapshot) {
    println!(
        "{} completed, {} attempted, {} skipped",
        counters.completed, counters.attempted, counters.skipped
    );
}

/// Fetches every item of `manifest`, prints a summary, and turns batch
/// failures into a CLI error.
pub async fn run_manifest(cfg: &FetchConfig, manifest: Manifest) -> Result<()> {
    tracing::info!(
        base = %manifest.source_base_url,
        items = manifest.len(),
        "fetching manifest"
    );
    let (result, counters) =
        run_engine(cfg, move |engine, counters| engine.fetch_manifest(&manifest, counters))
            .await?;
    print_summary(&counters);
    match result {
        Ok(_) => Ok(()),
        Err(BatchError::Incomplete { report }) => {
            for failure in report.failures() {
                if let TransferOutcome::Failed(reason) = &failure.outcome {
                    eprintln!("  {} -> {}: {}", failure.item.url, failure.item.destination.display(), reason);
                }
            }
            Err(BatchError::Incomplete { report }.into())
        }
        Err(e) => Err(e.into()),
    }
}
