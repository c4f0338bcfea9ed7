//! Application settings loaded from an optional TOML file

use crate::proxy::{CheckPolicy, CheckerConfig, DownloaderConfig};
use crate::Result;
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default settings file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "proxysync.toml";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

/// Top-level settings, passed explicitly to every component
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub files: FileSettings,
    pub check: CheckSettings,
    pub download: DownloadSettings,
}

/// Locations of the plain-text files the tool reads and writes
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileSettings {
    /// Raw provider output, converted into `proxy`
    pub proxylist: PathBuf,
    /// Canonical proxy list validated by the pipeline
    pub proxy: PathBuf,
    /// Target directories, one per line
    pub paths: PathBuf,
    /// Download URLs, one per line
    pub apilist: PathBuf,
    pub fail: PathBuf,
    pub success: PathBuf,
    pub backup: PathBuf,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            proxylist: PathBuf::from("proxylist.txt"),
            proxy: PathBuf::from("proxy.txt"),
            paths: PathBuf::from("paths.txt"),
            apilist: PathBuf::from("apilist.txt"),
            fail: PathBuf::from("fail_proxy.txt"),
            success: PathBuf::from("success_proxy.txt"),
            backup: PathBuf::from("proxy_backup.txt"),
        }
    }
}

/// Validation parameters
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CheckSettings {
    pub workers: usize,
    pub timeout_secs: u64,
    pub attempts: u32,
    pub retry_delay_ms: u64,
    pub urls: Vec<String>,
    pub policy: CheckPolicy,
    pub user_agent: String,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            workers: 50,
            timeout_secs: 10,
            attempts: 2,
            retry_delay_ms: 1000,
            urls: vec!["https://api.ipify.org".to_string()],
            policy: CheckPolicy::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// API download parameters
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DownloadSettings {
    pub workers: usize,
    pub timeout_secs: u64,
    pub attempts: u32,
    pub backoff_secs: u64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            workers: 3,
            timeout_secs: 30,
            attempts: 3,
            backoff_secs: 5,
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when the file is missing
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("invalid settings in {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn checker_config(&self) -> CheckerConfig {
        let check = &self.check;
        CheckerConfig::new()
            .with_concurrency(check.workers)
            .with_timeout(Duration::from_secs(check.timeout_secs))
            .with_attempts(check.attempts)
            .with_retry_delay(Duration::from_millis(check.retry_delay_ms))
            .with_check_urls(check.urls.clone())
            .with_policy(check.policy)
            .with_user_agent(check.user_agent.clone())
    }

    pub fn downloader_config(&self) -> DownloaderConfig {
        let download = &self.download;
        DownloaderConfig::new()
            .with_concurrency(download.workers)
            .with_timeout(Duration::from_secs(download.timeout_secs))
            .with_attempts(download.attempts)
            .with_backoff(Duration::from_secs(download.backoff_secs))
            .with_user_agent(self.check.user_agent.clone())
    }
}
