//! Downloading raw proxy lists from provider API URLs
//!
//! This module provides functionality for:
//! - Fetching several list URLs with a small concurrency cap
//! - Backing off linearly when a provider answers 429
//! - Merging the downloaded lines without duplicates

use crate::Result;
use anyhow::bail;
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of concurrent downloads
const DEFAULT_CONCURRENCY: usize = 3;

/// Default attempts per URL when rate limited
const DEFAULT_ATTEMPTS: u32 = 3;

/// Default user agent for HTTP requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

/// Result of downloading a single URL
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub source: String,
    pub lines: Vec<String>,
    pub error: Option<String>,
}

impl DownloadResult {
    pub fn success(source: String, lines: Vec<String>) -> Self {
        Self {
            source,
            lines,
            error: None,
        }
    }

    pub fn failure(source: String, error: String) -> Self {
        Self {
            source,
            lines: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Configuration for the downloader
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub concurrency: usize,
    /// Attempts per URL while the provider keeps answering 429
    pub attempts: u32,
    /// Base wait after a 429; the n-th retry waits `backoff * n`
    pub backoff: Duration,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            attempts: DEFAULT_ATTEMPTS,
            backoff: Duration::from_secs(5),
        }
    }
}

impl DownloaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Fetches raw proxy lists from provider URLs
pub struct ApiDownloader {
    config: DownloaderConfig,
    client: Client,
}

impl ApiDownloader {
    pub fn new() -> Result<Self> {
        Self::with_config(DownloaderConfig::default())
    }

    pub fn with_config(config: DownloaderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { config, client })
    }

    /// Fetch one URL and return its proxy lines
    pub async fn fetch_url(&self, url: &str) -> Result<Vec<String>> {
        let mut attempt = 1;
        loop {
            let response = self.client.get(url).send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= self.config.attempts {
                    bail!("rate limited after {} attempts", attempt);
                }
                let delay = self.config.backoff * attempt;
                warn!(url, attempt, ?delay, "rate limited, backing off");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                bail!("HTTP status: {}", status);
            }

            let content = response.text().await?;
            return Ok(extract_lines(&content));
        }
    }

    /// Fetch every URL, at most `concurrency` at a time, keeping input order
    pub async fn download_all(&self, urls: &[String]) -> Vec<DownloadResult> {
        stream::iter(urls)
            .map(|url| async move {
                match self.fetch_url(url).await {
                    Ok(lines) => {
                        debug!(url = %url, count = lines.len(), "downloaded proxy list");
                        DownloadResult::success(url.clone(), lines)
                    }
                    Err(e) => {
                        warn!(url = %url, error = %e, "download failed");
                        DownloadResult::failure(url.clone(), e.to_string())
                    }
                }
            })
            .buffered(self.config.concurrency)
            .collect()
            .await
    }
}

/// Non-empty, non-comment trimmed lines of a downloaded body
pub fn extract_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Merge successful downloads, dropping repeats and keeping first-seen order
pub fn merge_unique(results: &[DownloadResult]) -> Vec<String> {
    let mut seen = HashSet::new();
    results
        .iter()
        .flat_map(|result| result.lines.iter())
        .filter(|line| seen.insert(line.as_str()))
        .cloned()
        .collect()
}
