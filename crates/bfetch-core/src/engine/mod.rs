//! Fetch-and-verify engine.
//!
//! Consumes resolved transfer items, performs one GET per item through a
//! `Transport`, stores 200 responses at their destination, and keeps the
//! caller's `ProgressCounters` current. Batches run through a bounded worker
//! pool (`concurrency = 1` is strictly sequential). The hash-checked variant
//! skips the network entirely when a local file already has the expected
//! SHA-1.

mod batch;
mod outcome;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::checksum::{self, ExpectedDigest};
use crate::config::{FailurePolicy, FetchConfig};
use crate::error::{BatchError, FetchError};
use crate::http::{CurlOptions, CurlTransport, Transport, TransportError};
use crate::manifest::Manifest;
use crate::progress::{emit, ProgressCounters, ProgressEvent};
use crate::resolver::{self, TransferItem};
use crate::storage::StorageWriter;

pub use crate::progress::ProgressSender;
pub use outcome::{BatchReport, FailureReason, ItemReport, TransferOutcome};

/// Batch scheduling knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Maximum transfers in flight (clamped to at least 1).
    pub concurrency: usize,
    pub failure_policy: FailurePolicy,
    /// Overall deadline per batch; items still pending when it passes are cancelled.
    pub deadline: Option<Duration>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for EngineOptions {
    fn from(cfg: &FetchConfig) -> Self {
        Self {
            concurrency: cfg.concurrency.max(1),
            failure_policy: cfg.failure_policy,
            deadline: cfg.deadline(),
        }
    }
}

pub struct FetchEngine {
    transport: Arc<dyn Transport>,
    options: EngineOptions,
    events: Option<ProgressSender>,
    cancel: CancelToken,
}

impl FetchEngine {
    pub fn new(transport: Arc<dyn Transport>, options: EngineOptions) -> Self {
        Self {
            transport,
            options,
            events: None,
            cancel: CancelToken::new(),
        }
    }

    /// Engine backed by libcurl, configured from `cfg`.
    pub fn from_config(cfg: &FetchConfig) -> Self {
        let transport = CurlTransport::new(CurlOptions::from(cfg));
        Self::new(Arc::new(transport), EngineOptions::from(cfg))
    }

    /// Send one progress event per item to `tx`.
    pub fn with_events(mut self, tx: ProgressSender) -> Self {
        self.events = Some(tx);
        self
    }

    /// Use an externally owned token (e.g. tripped by Ctrl-C).
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Basic fetch of one item: count the attempt, GET, store on exactly 200.
    pub fn fetch_item(
        &self,
        item: &TransferItem,
        counters: &ProgressCounters,
    ) -> Result<TransferOutcome, FetchError> {
        self.run_item(item, counters, &self.scoped_cancel())
    }

    /// Hash-checked fetch: skip when `dest_dir/<basename of url>` already has
    /// the expected SHA-1, otherwise fall through to the basic fetch. The
    /// download honours the configured deadline.
    pub fn fetch_checked(
        &self,
        url: &str,
        dest_dir: &Path,
        expected_sha1: &str,
        counters: &ProgressCounters,
    ) -> Result<TransferOutcome, FetchError> {
        let expected = ExpectedDigest::parse(expected_sha1)?;
        let name = resolver::url_basename(url)?;
        let destination = dest_dir.join(&name);

        match checksum::sha1_path(&destination) {
            Ok(actual) => {
                tracing::info!("found file {}, SHA1: {}", name, actual);
                if expected.matches(&actual) {
                    counters.record_skipped();
                    tracing::info!("check SHA1 verified, skip downloading {}", name);
                    emit(
                        self.events.as_ref(),
                        ProgressEvent::Skipped {
                            url: url.to_string(),
                            file_name: name,
                        },
                    );
                    return Ok(TransferOutcome::Skipped);
                }
                tracing::debug!(expected = %expected, "SHA1 mismatch for {}, re-downloading", name);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(FetchError::Storage {
                    path: destination,
                    source,
                })
            }
        }

        let item = TransferItem {
            url: url.to_string(),
            destination,
        };
        let outcome = self.run_item(&item, counters, &self.scoped_cancel())?;
        match checksum::sha1_path(&item.destination) {
            Ok(actual) if !expected.matches(&actual) => {
                tracing::warn!(
                    expected = %expected,
                    actual = %actual,
                    "downloaded {} does not match the expected SHA1",
                    name
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("could not hash {}: {}", item.destination.display(), e),
        }
        Ok(outcome)
    }

    /// Resolve `manifest` and run the resulting items as one batch.
    pub fn fetch_manifest(
        &self,
        manifest: &Manifest,
        counters: &ProgressCounters,
    ) -> Result<BatchReport, BatchError> {
        let items = resolver::resolve(manifest).map_err(FetchError::from)?;
        self.run_batch(&items, counters)
    }

    /// The engine token, narrowed by the configured deadline (counted from now).
    fn scoped_cancel(&self) -> CancelToken {
        match self.options.deadline {
            Some(deadline) => self.cancel.child_with_timeout(deadline),
            None => self.cancel.clone(),
        }
    }

    /// Attempt one item and report failures to the log and event channel.
    fn run_item(
        &self,
        item: &TransferItem,
        counters: &ProgressCounters,
        cancel: &CancelToken,
    ) -> Result<TransferOutcome, FetchError> {
        let result = self.download(item, counters, cancel);
        if let Err(e) = &result {
            tracing::warn!(url = %item.url, "download failed: {}", e);
            emit(
                self.events.as_ref(),
                ProgressEvent::Failed {
                    url: item.url.clone(),
                    message: e.to_string(),
                },
            );
        }
        result
    }

    fn download(
        &self,
        item: &TransferItem,
        counters: &ProgressCounters,
        cancel: &CancelToken,
    ) -> Result<TransferOutcome, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled {
                url: item.url.clone(),
            });
        }
        let attempted = counters.record_attempt();
        tracing::debug!(url = %item.url, attempted, "GET");

        let storage_err = |source: io::Error| FetchError::Storage {
            path: item.destination.clone(),
            source,
        };

        // Dropped on every early return below, which removes the temp file.
        let mut writer = StorageWriter::create(&item.destination).map_err(storage_err)?;
        let status = self
            .transport
            .get(&item.url, &mut writer, cancel)
            .map_err(|e| match e {
                TransportError::Curl(source) => FetchError::Transport {
                    url: item.url.clone(),
                    source,
                },
                TransportError::Sink(source) => storage_err(source),
                TransportError::Cancelled => FetchError::Cancelled {
                    url: item.url.clone(),
                },
            })?;
        if !status.is_ok() {
            return Err(FetchError::Http {
                url: item.url.clone(),
                status: status.code,
                reason: status.reason,
            });
        }
        let bytes = writer.finalize().map_err(storage_err)?;

        let completed = counters.record_completed();
        let attempted = counters.attempted();
        tracing::info!("download completed [{}/{}]: {}", completed, attempted, item.url);
        emit(
            self.events.as_ref(),
            ProgressEvent::Completed {
                url: item.url.clone(),
                bytes,
                completed,
                attempted,
            },
        );
        Ok(TransferOutcome::Completed { bytes })
    }
}
