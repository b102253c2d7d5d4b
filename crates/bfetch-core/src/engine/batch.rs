//! Bounded worker pool for a batch of transfer items.
//!
//! `min(concurrency, items)` scoped threads pull `(index, item)` pairs from a
//! shared queue and send results back over a channel. Results are re-sorted by
//! manifest index, so the report and the fail-fast error do not depend on
//! completion order.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Mutex};

use crate::config::FailurePolicy;
use crate::error::{BatchError, FetchError};
use crate::progress::ProgressCounters;
use crate::resolver::{self, TransferItem};

use super::{BatchReport, FailureReason, FetchEngine, ItemReport, TransferOutcome};

type ItemResult = Result<TransferOutcome, FetchError>;

impl FetchEngine {
    /// Run `items` through the worker pool.
    ///
    /// Items sharing a destination are rejected up front, since two workers
    /// would otherwise write the same temp file.
    ///
    /// Fail-fast: the first failure stops dispatch of further items; in-flight
    /// items finish, and the failure with the lowest index is returned.
    /// Collect-all: every item is attempted; failures come back as
    /// `BatchError::Incomplete` with the full report. Items still queued when
    /// the cancel token trips (Ctrl-C or deadline) fail as cancelled.
    pub fn run_batch(
        &self,
        items: &[TransferItem],
        counters: &ProgressCounters,
    ) -> Result<BatchReport, BatchError> {
        resolver::check_unique_destinations(items).map_err(FetchError::from)?;
        let cancel = self.scoped_cancel();
        let fail_fast = self.options.failure_policy == FailurePolicy::FailFast;
        let workers = self.options.concurrency.max(1).min(items.len());
        tracing::debug!(items = items.len(), workers, fail_fast, "starting batch");

        let queue: Mutex<VecDeque<(usize, &TransferItem)>> =
            Mutex::new(items.iter().enumerate().collect());
        let stop = AtomicBool::new(false);
        let (tx, rx) = mpsc::channel::<(usize, ItemResult)>();

        let mut results: Vec<(usize, ItemResult)> = Vec::with_capacity(items.len());
        std::thread::scope(|s| {
            for _ in 0..workers {
                let tx = tx.clone();
                let queue = &queue;
                let stop = &stop;
                let cancel = &cancel;
                s.spawn(move || loop {
                    if fail_fast && stop.load(Ordering::Acquire) {
                        break;
                    }
                    let next = queue
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .pop_front();
                    let Some((index, item)) = next else {
                        break;
                    };
                    let res = self.run_item(item, counters, cancel);
                    if res.is_err() {
                        stop.store(true, Ordering::Release);
                    }
                    if tx.send((index, res)).is_err() {
                        break;
                    }
                });
            }
            drop(tx);
            results.extend(rx);
        });
        results.sort_by_key(|(index, _)| *index);

        if fail_fast {
            if let Some(pos) = results.iter().position(|(_, r)| r.is_err()) {
                let (_, first) = results.swap_remove(pos);
                if let Err(e) = first {
                    return Err(BatchError::Aborted(e));
                }
            }
        }

        let report = BatchReport {
            items: results
                .into_iter()
                .map(|(index, res)| ItemReport {
                    index,
                    item: items[index].clone(),
                    outcome: res.unwrap_or_else(|e| TransferOutcome::Failed(FailureReason::from(&e))),
                })
                .collect(),
            counters: counters.snapshot(),
        };
        if report.failed_count() > 0 {
            tracing::warn!(
                failed = report.failed_count(),
                total = report.items.len(),
                "batch finished with failures"
            );
            return Err(BatchError::Incomplete { report });
        }
        tracing::info!(
            completed = report.counters.completed,
            attempted = report.counters.attempted,
            "batch finished"
        );
        Ok(report)
    }
}
