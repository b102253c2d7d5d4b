use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What a batch does when one transfer fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop dispatching after the first failure and surface that error.
    #[default]
    FailFast,
    /// Attempt every item and report all failures at the end.
    CollectAll,
}

/// Global configuration loaded from `~/.config/bfetch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum number of transfers in flight at once (1 = strictly sequential).
    pub concurrency: usize,
    /// Batch behaviour on the first failed transfer.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Optional per-request timeout in seconds (None = no limit).
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Optional deadline for a whole batch in seconds (None = no limit).
    #[serde(default)]
    pub deadline_secs: Option<u64>,
    /// Maximum number of redirects followed per request.
    pub max_redirects: u32,
    /// User-Agent header; defaults to `bfetch/<version>`.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            failure_policy: FailurePolicy::FailFast,
            connect_timeout_secs: 30,
            request_timeout_secs: None,
            deadline_secs: None,
            max_redirects: 10,
            user_agent: None,
        }
    }
}

impl FetchConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("bfetch/{}", env!("CARGO_PKG_VERSION")))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("bfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetchConfig> {
    load_or_init_at(&config_path()?)
}

/// Like `load_or_init` but for an explicit path (tests, `--config`).
pub fn load_or_init_at(path: &Path) -> Result<FetchConfig> {
    if !path.exists() {
        let default_cfg = FetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: FetchConfig = toml::from_str(&data)?;
    Ok(cfg)
}
