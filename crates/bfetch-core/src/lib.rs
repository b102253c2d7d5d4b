pub mod config;
pub mod logging;

pub mod cancel;
pub mod checksum;
pub mod engine;
pub mod error;
pub mod http;
pub mod manifest;
pub mod progress;
pub mod resolver;
pub mod storage;

pub use engine::{BatchReport, EngineOptions, FetchEngine, TransferOutcome};
pub use error::{BatchError, FetchError, ManifestError};
pub use manifest::Manifest;
pub use resolver::TransferItem;
