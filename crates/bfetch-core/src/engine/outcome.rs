//! Per-item outcomes and the batch report.

use std::fmt;

use crate::error::FetchError;
use crate::progress::CounterSnapshot;
use crate::resolver::TransferItem;

/// Why a transfer did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Http { status: u32, reason: String },
    Transport(String),
    Storage(String),
    Invalid(String),
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Http { status, reason } => write!(f, "HTTP {} {}", status, reason),
            FailureReason::Transport(msg) => write!(f, "transport: {}", msg),
            FailureReason::Storage(msg) => write!(f, "storage: {}", msg),
            FailureReason::Invalid(msg) => write!(f, "{}", msg),
            FailureReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl From<&FetchError> for FailureReason {
    fn from(err: &FetchError) -> Self {
        match err {
            FetchError::Http { status, reason, .. } => FailureReason::Http {
                status: *status,
                reason: reason.clone(),
            },
            FetchError::Transport { source, .. } => FailureReason::Transport(source.to_string()),
            FetchError::Storage { source, .. } => FailureReason::Storage(source.to_string()),
            FetchError::Cancelled { .. } => FailureReason::Cancelled,
            FetchError::Manifest(e) => FailureReason::Invalid(e.to_string()),
        }
    }
}

/// Result of attempting one transfer item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// HTTP 200 received and the body stored at the destination.
    Completed { bytes: u64 },
    /// A local file already matched the expected digest; nothing was fetched.
    Skipped,
    Failed(FailureReason),
}

impl TransferOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TransferOutcome::Completed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TransferOutcome::Failed(_))
    }
}

/// Outcome of one item within a batch, tagged with its manifest position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub index: usize,
    pub item: TransferItem,
    pub outcome: TransferOutcome,
}

/// All processed items in manifest order, plus the counters at the end of the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
    pub counters: CounterSnapshot,
}

impl BatchReport {
    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|r| r.outcome.is_completed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.items.iter().filter(|r| r.outcome.is_failed()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.items
            .iter()
            .filter(|r| r.outcome == TransferOutcome::Skipped)
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items.iter().filter(|r| r.outcome.is_failed())
    }
}
