//! Proxy module for loading, normalizing, checking and distributing proxies
//!
//! This module provides functionality for:
//! - Parsing proxies from various formats (IP:PORT, IP:PORT:USER:PASS, etc.)
//! - Converting raw provider lists into canonical proxy URLs
//! - Downloading raw lists from provider API URLs
//! - Loading and deduplicating proxy files
//! - Checking proxy validity with bounded concurrency
//! - Distributing working proxies into target directories

pub mod checker;
pub mod converter;
pub mod distributor;
pub mod downloader;
pub mod loader;
pub mod models;
pub mod parser;
pub mod validator;

pub use checker::{CheckPolicy, CheckerConfig, ProxyCheck, ProxyChecker};
pub use converter::ConversionReport;
pub use distributor::{DistributionResult, DistributionStatus};
pub use downloader::{ApiDownloader, DownloadResult, DownloaderConfig};
pub use loader::SourceList;
pub use models::{CheckFailure, Proxy, ProxyAuth, ProxyCheckResult, ProxyCheckStatus, ProxyType};
pub use parser::{Normalized, ProxyParser};
pub use validator::{ValidationReport, Validator};
