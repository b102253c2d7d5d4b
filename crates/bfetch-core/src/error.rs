//! Error types for manifest resolution and transfers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::engine::BatchReport;

/// Problems detected before any network call. Nothing is fetched and no
/// counters move when one of these is returned.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("invalid manifest: base URL {url:?} does not parse: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid manifest: unsupported scheme {scheme:?} in {url:?} (expected http or https)")]
    UnsupportedScheme { url: String, scheme: String },
    #[error("invalid manifest: URL {url:?} has no host")]
    MissingHost { url: String },
    #[error("invalid manifest: empty relative path")]
    EmptyPath,
    #[error("invalid manifest: path {path:?} must be relative")]
    AbsolutePath { path: String },
    #[error("invalid manifest: path {path:?} escapes the destination root")]
    PathTraversal { path: String },
    #[error("invalid manifest: duplicate rename source {source_path:?}")]
    DuplicateRename { source_path: String },
    #[error("invalid manifest: destination {} is listed more than once", .path.display())]
    DuplicateDestination { path: PathBuf },
    #[error("invalid manifest: URL {url:?} has no file name")]
    MissingBasename { url: String },
    #[error("invalid manifest: expected digest {digest:?} is not a 40-character SHA-1 hex string")]
    InvalidDigest { digest: String },
    #[error("invalid manifest: cannot determine working directory: {0}")]
    WorkingDir(#[source] io::Error),
}

/// Failure of a single transfer.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url}: HTTP status {status}-'{reason}' received instead of 200")]
    Http {
        url: String,
        status: u32,
        reason: String,
    },
    #[error("GET {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: curl::Error,
    },
    #[error("{}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("GET {url}: cancelled")]
    Cancelled { url: String },
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

impl FetchError {
    /// HTTP status carried by the error, if the server answered.
    pub fn status(&self) -> Option<u32> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled { .. })
    }
}

/// Failure of a batch as a whole.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Fail-fast: the first failing item (lowest manifest index) aborted the batch.
    #[error(transparent)]
    Aborted(#[from] FetchError),
    /// Collect-all: every item was attempted and at least one failed.
    #[error("{} of {} transfers failed", .report.failed_count(), .report.items.len())]
    Incomplete { report: BatchReport },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_names_url_status_and_reason() {
        let err = FetchError::Http {
            url: "https://example.com/pkg/a.txt".to_string(),
            status: 404,
            reason: "Not Found".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("https://example.com/pkg/a.txt"));
        assert!(msg.contains("404"));
        assert!(msg.contains("Not Found"));
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn manifest_errors_are_prefixed() {
        let err = ManifestError::PathTraversal {
            path: "../etc/passwd".to_string(),
        };
        assert!(err.to_string().starts_with("invalid manifest:"));
        let fetch: FetchError = err.into();
        assert!(fetch.to_string().starts_with("invalid manifest:"));
        assert_eq!(fetch.status(), None);
    }
}
