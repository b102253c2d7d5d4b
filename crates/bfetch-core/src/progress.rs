//! Running totals for a batch and per-item progress events.
//!
//! Counters are owned by the caller and passed by reference into the engine,
//! so partial totals stay readable after a failed batch.

use std::sync::atomic::{AtomicU64, Ordering};

/// `attempted` / `completed` / `skipped` totals for one invocation.
#[derive(Debug, Default)]
pub struct ProgressCounters {
    attempted: AtomicU64,
    completed: AtomicU64,
    skipped: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub attempted: u64,
    pub completed: u64,
    pub skipped: u64,
}

impl ProgressCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a transfer is starting; returns the new `attempted` total.
    pub fn record_attempt(&self) -> u64 {
        self.attempted.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Record a completed transfer; returns the new `completed` total.
    pub fn record_completed(&self) -> u64 {
        self.completed.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Record a transfer skipped by a matching local digest.
    pub fn record_skipped(&self) -> u64 {
        self.skipped.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn attempted(&self) -> u64 {
        self.attempted.load(Ordering::Acquire)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            attempted: self.attempted(),
            completed: self.completed(),
            skipped: self.skipped(),
        }
    }
}

/// Per-item event sent to an optional front-end channel. Every event names its
/// URL so lines stay attributable when transfers run in parallel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Completed {
        url: String,
        bytes: u64,
        completed: u64,
        attempted: u64,
    },
    Skipped {
        url: String,
        file_name: String,
    },
    Failed {
        url: String,
        message: String,
    },
}

/// Sender half for per-item events. Unbounded: one event per item, never
/// dropped, never blocks a transfer.
pub type ProgressSender = tokio::sync::mpsc::UnboundedSender<ProgressEvent>;

/// Sends `event` if a receiver is attached; a closed channel is ignored.
pub(crate) fn emit(tx: Option<&ProgressSender>, event: ProgressEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event);
    }
}
