//! Proxy checker module for checking proxy validity

use crate::proxy::models::{CheckFailure, Proxy, ProxyCheckResult, ProxyType};
use crate::proxy::parser::ProxyParser;
use crate::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Proxy as ReqwestProxy};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default timeout for proxy checks in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of concurrent checks
const DEFAULT_CONCURRENCY: usize = 50;

/// Default number of attempts per check URL
const DEFAULT_ATTEMPTS: u32 = 2;

/// Default URL to test proxies against
const DEFAULT_CHECK_URL: &str = "https://api.ipify.org";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

static IPV4_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\b").expect("Invalid IPv4 regex")
});

/// How results from several check URLs combine into one verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CheckPolicy {
    /// Every URL has to answer; the first failing URL decides the reason
    #[default]
    #[serde(rename = "strict")]
    AllMustPass,
    /// The first URL that answers wins; the last failure is reported otherwise
    #[serde(rename = "lenient")]
    FirstSuccess,
}

/// Configuration for proxy checker
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Timeout for each request
    pub timeout: Duration,
    /// Number of concurrent checks
    pub concurrency: usize,
    /// Attempts per URL, including the first one
    pub attempts: u32,
    /// Sleep between attempts; rate-limited attempts wait `retry_delay * attempt`
    pub retry_delay: Duration,
    /// URLs to test proxies against, in order
    pub check_urls: Vec<String>,
    pub policy: CheckPolicy,
    pub user_agent: String,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            attempts: DEFAULT_ATTEMPTS,
            retry_delay: Duration::from_secs(1),
            check_urls: vec![DEFAULT_CHECK_URL.to_string()],
            policy: CheckPolicy::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
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

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_check_urls(mut self, urls: Vec<String>) -> Self {
        self.check_urls = urls;
        self
    }

    pub fn with_policy(mut self, policy: CheckPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// A single-proxy check, run once per proxy by the validator
#[async_trait]
pub trait ProxyCheck: Send + Sync {
    async fn check(&self, proxy: &str) -> ProxyCheckResult;

    /// Worker cap this check was configured with, if it carries one
    fn concurrency(&self) -> Option<usize> {
        None
    }
}

/// Checks proxies by fetching "what is my IP" endpoints through them
#[derive(Debug, Clone, Default)]
pub struct ProxyChecker {
    config: CheckerConfig,
}

impl ProxyChecker {
    /// Create a new proxy checker with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new proxy checker with custom configuration
    pub fn with_config(config: CheckerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Check a single proxy line against the configured URLs
    pub async fn check_proxy(&self, line: &str) -> ProxyCheckResult {
        let Some(proxy) = ProxyParser::parse_line(line, ProxyType::Http) else {
            return ProxyCheckResult::failed(
                line.to_string(),
                CheckFailure::InvalidProxy("unrecognized format".to_string()),
            );
        };

        let client = match self.create_client(&proxy) {
            Ok(client) => client,
            Err(e) => {
                return ProxyCheckResult::failed(
                    line.to_string(),
                    CheckFailure::InvalidProxy(e.to_string()),
                )
            }
        };

        let start = Instant::now();
        match self.run_policy(&client).await {
            Ok(()) => ProxyCheckResult::working(line.to_string(), millis(start.elapsed())),
            Err(reason) => {
                debug!(proxy = %proxy.to_simple_string(), %reason, "proxy check failed");
                ProxyCheckResult::failed(line.to_string(), reason)
            }
        }
    }

    async fn run_policy(&self, client: &Client) -> std::result::Result<(), CheckFailure> {
        if self.config.check_urls.is_empty() {
            return Err(CheckFailure::InvalidResponse(
                "no check URL configured".to_string(),
            ));
        }

        let mut last_failure = None;
        for url in &self.config.check_urls {
            match self.check_url(client, url).await {
                Ok(()) if self.config.policy == CheckPolicy::FirstSuccess => return Ok(()),
                Ok(()) => {}
                Err(failure) if self.config.policy == CheckPolicy::AllMustPass => {
                    return Err(failure)
                }
                Err(failure) => last_failure = Some(failure),
            }
        }

        match last_failure {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    /// Request one URL, retrying retryable failures up to the attempt limit
    async fn check_url(&self, client: &Client, url: &str) -> std::result::Result<(), CheckFailure> {
        let mut attempt = 1;
        loop {
            let failure = match self.request_once(client, url).await {
                Ok(()) => return Ok(()),
                Err(failure) => failure,
            };

            if !failure.is_retryable() || attempt >= self.config.attempts {
                return Err(failure);
            }

            let delay = match failure {
                CheckFailure::RateLimited => self.config.retry_delay * attempt,
                _ => self.config.retry_delay,
            };
            debug!(url, attempt, %failure, ?delay, "retrying check");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn request_once(&self, client: &Client, url: &str) -> std::result::Result<(), CheckFailure> {
        let timeout_ms = millis(self.config.timeout);

        let response = match tokio::time::timeout(self.config.timeout, client.get(url).send()).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_timeout() => return Err(CheckFailure::Timeout(timeout_ms)),
            Ok(Err(e)) => return Err(CheckFailure::ConnectionFailed(e.to_string())),
            Err(_) => return Err(CheckFailure::Timeout(timeout_ms)),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(CheckFailure::from_status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CheckFailure::ConnectionFailed(e.to_string()))?;
        match extract_ip(&body) {
            Some(_) => Ok(()),
            None => Err(CheckFailure::InvalidResponse(snippet(&body))),
        }
    }

    /// Create a reqwest client routed through the proxy
    fn create_client(&self, proxy: &Proxy) -> Result<Client> {
        let client = Client::builder()
            .proxy(ReqwestProxy::all(proxy.url())?)
            .timeout(self.config.timeout)
            .user_agent(&self.config.user_agent)
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(client)
    }
}

#[async_trait]
impl ProxyCheck for ProxyChecker {
    async fn check(&self, proxy: &str) -> ProxyCheckResult {
        self.check_proxy(proxy).await
    }

    fn concurrency(&self) -> Option<usize> {
        Some(self.config.concurrency)
    }
}

/// Find the IP address reported by a "what is my IP" endpoint.
///
/// Accepts a JSON object with an `ip` field, or any text containing an
/// IPv4 or IPv6 address token.
pub fn extract_ip(body: &str) -> Option<IpAddr> {
    let body = body.trim();

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(ip) = map.get("ip").and_then(|v| v.as_str()) {
            return ip.trim().parse().ok();
        }
    }

    if let Some(ip) = IPV4_REGEX
        .captures_iter(body)
        .find_map(|caps| caps[1].parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    body.split(|c: char| c.is_whitespace() || c == ',' || c == '"')
        .find_map(|token| token.parse::<IpAddr>().ok())
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty body".to_string();
    }
    trimmed.chars().take(60).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{spawn_blackhole, spawn_fake_server};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const OK_BODY: &str = "203.0.113.7";

    fn fast_config(proxy_urls: &[&str]) -> CheckerConfig {
        CheckerConfig::new()
            .with_timeout(Duration::from_secs(2))
            .with_retry_delay(Duration::ZERO)
            .with_check_urls(proxy_urls.iter().map(|u| u.to_string()).collect())
    }

    #[test]
    fn test_checker_config_default() {
        let config = CheckerConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.attempts, DEFAULT_ATTEMPTS);
        assert_eq!(config.check_urls, vec![DEFAULT_CHECK_URL.to_string()]);
        assert_eq!(config.policy, CheckPolicy::AllMustPass);
    }

    #[test]
    fn test_checker_config_builder() {
        let config = CheckerConfig::new()
            .with_timeout(Duration::from_secs(25))
            .with_concurrency(0)
            .with_attempts(3)
            .with_policy(CheckPolicy::FirstSuccess)
            .with_check_urls(vec!["http://example.com".to_string()]);

        assert_eq!(config.timeout, Duration::from_secs(25));
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.attempts, 3);
        assert_eq!(config.policy, CheckPolicy::FirstSuccess);
        assert_eq!(config.check_urls, vec!["http://example.com".to_string()]);
    }

    #[test]
    fn test_extract_ip() {
        assert_eq!(extract_ip("203.0.113.7\n"), "203.0.113.7".parse().ok());
        assert_eq!(extract_ip(r#"{"ip": "198.51.100.1"}"#), "198.51.100.1".parse().ok());
        assert_eq!(extract_ip("2001:db8::1"), "2001:db8::1".parse().ok());
        assert_eq!(extract_ip("origin: 10.1.2.3, 10.1.2.4"), "10.1.2.3".parse().ok());
        assert!(extract_ip("<html>blocked</html>").is_none());
        assert!(extract_ip("").is_none());
    }

    #[tokio::test]
    async fn test_unparseable_proxy_fails_without_network() {
        let checker = ProxyChecker::new();
        let result = checker.check_proxy("not a proxy").await;
        assert!(matches!(result.failure(), Some(CheckFailure::InvalidProxy(_))));
        assert_eq!(result.proxy, "not a proxy");
    }

    #[tokio::test]
    async fn test_working_proxy() {
        let addr = spawn_fake_server(|_, _| (200, OK_BODY.to_string())).await;
        let checker = ProxyChecker::with_config(fast_config(&["http://check.test/"]));

        let result = checker.check_proxy(&addr.to_string()).await;
        assert!(result.is_working(), "{:?}", result.status);
        assert!(result.response_time_ms.is_some());
    }

    #[tokio::test]
    async fn test_rate_limit_then_success_is_working() {
        let addr = spawn_fake_server(|_, index| match index {
            0 => (429, String::new()),
            _ => (200, OK_BODY.to_string()),
        })
        .await;
        let checker = ProxyChecker::with_config(fast_config(&["http://check.test/"]));

        let result = checker.check_proxy(&format!("http://{}", addr)).await;
        assert!(result.is_working(), "{:?}", result.status);
    }

    #[tokio::test]
    async fn test_rate_limited_on_every_attempt() {
        let addr = spawn_fake_server(|_, _| (429, String::new())).await;
        let checker = ProxyChecker::with_config(fast_config(&["http://check.test/"]));

        let result = checker.check_proxy(&addr.to_string()).await;
        assert_eq!(result.failure(), Some(&CheckFailure::RateLimited));
    }

    #[tokio::test]
    async fn test_proxy_auth_required_is_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let addr = spawn_fake_server(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            (407, String::new())
        })
        .await;
        let checker =
            ProxyChecker::with_config(fast_config(&["http://check.test/"]).with_attempts(3));

        let result = checker.check_proxy(&addr.to_string()).await;
        assert_eq!(result.failure(), Some(&CheckFailure::ProxyAuthRequired));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_body() {
        let addr = spawn_fake_server(|_, _| (200, "<html>captcha</html>".to_string())).await;
        let checker = ProxyChecker::with_config(fast_config(&["http://check.test/"]));

        let result = checker.check_proxy(&addr.to_string()).await;
        assert!(matches!(result.failure(), Some(CheckFailure::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_strict_and_lenient_policies() {
        let handler = |request_line: &str, _: usize| {
            if request_line.contains("good.test") {
                (200, OK_BODY.to_string())
            } else {
                (503, String::new())
            }
        };
        let addr = spawn_fake_server(handler).await;
        let urls = ["http://bad.test/", "http://good.test/"];

        let strict = ProxyChecker::with_config(fast_config(&urls));
        let result = strict.check_proxy(&addr.to_string()).await;
        assert_eq!(result.failure(), Some(&CheckFailure::HttpStatus(503)));

        let lenient =
            ProxyChecker::with_config(fast_config(&urls).with_policy(CheckPolicy::FirstSuccess));
        let result = lenient.check_proxy(&addr.to_string()).await;
        assert!(result.is_working(), "{:?}", result.status);
    }

    #[tokio::test]
    async fn test_unresponsive_proxy_times_out_after_all_attempts() {
        let addr = spawn_blackhole().await;
        let config = fast_config(&["http://check.test/"])
            .with_timeout(Duration::from_secs(1))
            .with_attempts(2);
        let checker = ProxyChecker::with_config(config);

        let start = Instant::now();
        let result = checker.check_proxy(&addr.to_string()).await;
        let elapsed = start.elapsed();

        assert!(matches!(result.failure(), Some(CheckFailure::Timeout(1000))));
        assert!(elapsed >= Duration::from_millis(1900), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(5), "{:?}", elapsed);
    }

    #[tokio::test]
    async fn test_sub_second_timeout_is_reported_in_millis() {
        let addr = spawn_blackhole().await;
        let config = fast_config(&["http://check.test/"])
            .with_timeout(Duration::from_millis(300))
            .with_attempts(1);
        let checker = ProxyChecker::with_config(config);

        let result = checker.check_proxy(&addr.to_string()).await;
        let failure = result.failure().unwrap();
        assert_eq!(failure, &CheckFailure::Timeout(300));
        assert_eq!(failure.to_string(), "timed out after 300ms");
    }

    #[tokio::test]
    async fn test_rate_limit_waits_retry_delay() {
        let addr = spawn_fake_server(|_, index| match index {
            0 => (429, String::new()),
            _ => (200, OK_BODY.to_string()),
        })
        .await;
        let config =
            fast_config(&["http://check.test/"]).with_retry_delay(Duration::from_millis(200));
        let checker = ProxyChecker::with_config(config);

        let start = Instant::now();
        let result = checker.check_proxy(&addr.to_string()).await;
        let elapsed = start.elapsed();

        assert!(result.is_working(), "{:?}", result.status);
        assert!(elapsed >= Duration::from_millis(200), "{:?}", elapsed);
    }

    #[tokio::test]
    async fn test_rate_limit_backoff_grows_linearly() {
        let addr = spawn_fake_server(|_, index| match index {
            0 | 1 => (429, String::new()),
            _ => (200, OK_BODY.to_string()),
        })
        .await;
        let config = fast_config(&["http://check.test/"])
            .with_attempts(3)
            .with_retry_delay(Duration::from_millis(100));
        let checker = ProxyChecker::with_config(config);

        let start = Instant::now();
        let result = checker.check_proxy(&addr.to_string()).await;
        let elapsed = start.elapsed();

        // 100ms after the first 429, 200ms after the second
        assert!(result.is_working(), "{:?}", result.status);
        assert!(elapsed >= Duration::from_millis(300), "{:?}", elapsed);
    }

    #[tokio::test]
    async fn test_other_failures_wait_fixed_delay() {
        let addr = spawn_fake_server(|_, index| match index {
            0 | 1 => (503, String::new()),
            _ => (200, OK_BODY.to_string()),
        })
        .await;
        let config = fast_config(&["http://check.test/"])
            .with_attempts(3)
            .with_retry_delay(Duration::from_millis(300));
        let checker = ProxyChecker::with_config(config);

        let start = Instant::now();
        let result = checker.check_proxy(&addr.to_string()).await;
        let elapsed = start.elapsed();

        assert!(result.is_working(), "{:?}", result.status);
        assert!(elapsed >= Duration::from_millis(600), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(900), "{:?}", elapsed);
    }

    #[test]
    fn test_checker_exposes_configured_concurrency() {
        let checker = ProxyChecker::with_config(CheckerConfig::new().with_concurrency(5));
        assert_eq!(ProxyCheck::concurrency(&checker), Some(5));
    }
}
