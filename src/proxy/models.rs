//! Proxy data models

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Proxy type enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    #[default]
    Http,
    Https,
    Socks4,
    Socks5,
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyType::Http => write!(f, "http"),
            ProxyType::Https => write!(f, "https"),
            ProxyType::Socks4 => write!(f, "socks4"),
            ProxyType::Socks5 => write!(f, "socks5"),
        }
    }
}

/// Proxy authentication credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

impl ProxyAuth {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }
}

/// Structured view of a proxy line, derived when a client has to be built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    pub host: String,
    pub port: u16,
    pub proxy_type: ProxyType,
    pub auth: Option<ProxyAuth>,
}

impl Proxy {
    /// Create a new proxy without authentication
    pub fn new(host: String, port: u16, proxy_type: ProxyType) -> Self {
        Self {
            host,
            port,
            proxy_type,
            auth: None,
        }
    }

    /// Create a new proxy with authentication
    pub fn with_auth(
        host: String,
        port: u16,
        proxy_type: ProxyType,
        username: String,
        password: String,
    ) -> Self {
        Self {
            host,
            port,
            proxy_type,
            auth: Some(ProxyAuth::new(username, password)),
        }
    }

    /// Canonical `scheme://[user:pass@]host:port` form
    pub fn url(&self) -> String {
        let auth_part = self.auth.as_ref().map_or(String::new(), |auth| {
            format!("{}:{}@", auth.username, auth.password)
        });

        format!("{}://{}{}:{}", self.proxy_type, auth_part, self.host, self.port)
    }

    /// Get the proxy string in HOST:PORT format
    pub fn to_simple_string(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}

/// Reason a proxy check failed, with the free-text detail behind it
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CheckFailure {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// Elapsed budget in milliseconds
    #[error("timed out after {0}ms")]
    Timeout(u64),
    #[error("authentication required (401)")]
    AuthRequired,
    #[error("forbidden (403)")]
    Forbidden,
    #[error("proxy authentication required (407)")]
    ProxyAuthRequired,
    #[error("rate limited (429)")]
    RateLimited,
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid proxy: {0}")]
    InvalidProxy(String),
}

impl CheckFailure {
    /// Map a non-success HTTP status to its failure reason
    pub fn from_status(code: u16) -> Self {
        match code {
            401 => CheckFailure::AuthRequired,
            403 => CheckFailure::Forbidden,
            407 => CheckFailure::ProxyAuthRequired,
            429 => CheckFailure::RateLimited,
            other => CheckFailure::HttpStatus(other),
        }
    }

    /// Whether another attempt can change the outcome
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            CheckFailure::AuthRequired
                | CheckFailure::Forbidden
                | CheckFailure::ProxyAuthRequired
                | CheckFailure::InvalidResponse(_)
                | CheckFailure::InvalidProxy(_)
        )
    }
}

/// Result of proxy check operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyCheckStatus {
    Working,
    Failed(CheckFailure),
}

/// Detailed result of a proxy check, keyed by the proxy line as loaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyCheckResult {
    pub proxy: String,
    pub status: ProxyCheckStatus,
    pub response_time_ms: Option<u64>,
}

impl ProxyCheckResult {
    pub fn working(proxy: String, response_time_ms: u64) -> Self {
        Self {
            proxy,
            status: ProxyCheckStatus::Working,
            response_time_ms: Some(response_time_ms),
        }
    }

    pub fn failed(proxy: String, reason: CheckFailure) -> Self {
        Self {
            proxy,
            status: ProxyCheckStatus::Failed(reason),
            response_time_ms: None,
        }
    }

    pub fn is_working(&self) -> bool {
        matches!(self.status, ProxyCheckStatus::Working)
    }

    pub fn failure(&self) -> Option<&CheckFailure> {
        match &self.status {
            ProxyCheckStatus::Failed(reason) => Some(reason),
            ProxyCheckStatus::Working => None,
        }
    }

    /// The `host:port` part of the proxy line, without scheme or credentials
    pub fn display_address(&self) -> &str {
        let rest = self
            .proxy
            .split_once("://")
            .map_or(self.proxy.as_str(), |(_, rest)| rest);
        rest.rsplit_once('@').map_or(rest, |(_, addr)| addr)
    }
}
