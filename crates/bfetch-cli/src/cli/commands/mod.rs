//! CLI command handlers, one per file.

mod batch;
mod check;
mod completions;
mod fetch;
mod get;
mod sha1;

pub use batch::{apply_batch_overrides, BatchOverrides};
pub use check::run_check;
pub use completions::run_completions;
pub use fetch::run_fetch;
pub use get::run_get;
pub use sha1::run_sha1;
