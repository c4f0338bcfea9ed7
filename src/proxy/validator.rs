//! Bounded concurrent validation of proxy lists

use crate::proxy::checker::ProxyCheck;
use crate::proxy::loader::save_lines;
use crate::proxy::models::{CheckFailure, ProxyCheckResult};
use crate::Result;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Rows shown in the failure diagnostics table
pub const DIAGNOSTIC_ROWS: usize = 10;

/// Outcome of validating a whole list, in completion order
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub good: Vec<ProxyCheckResult>,
    pub failed: Vec<ProxyCheckResult>,
}

impl ValidationReport {
    /// Partition results into working and failed, keeping completion order
    pub fn from_results<I: IntoIterator<Item = ProxyCheckResult>>(results: I) -> Self {
        let (good, failed) = results.into_iter().partition(|r| r.is_working());
        Self { good, failed }
    }

    pub fn total(&self) -> usize {
        self.good.len() + self.failed.len()
    }

    pub fn good_proxies(&self) -> Vec<String> {
        self.good.iter().map(|r| r.proxy.clone()).collect()
    }

    pub fn failed_proxies(&self) -> Vec<String> {
        self.failed.iter().map(|r| r.proxy.clone()).collect()
    }

    /// First `limit` failures as (host:port, reason), credentials stripped
    pub fn diagnostics(&self, limit: usize) -> Vec<(&str, &CheckFailure)> {
        self.failed
            .iter()
            .filter_map(|r| r.failure().map(|reason| (r.display_address(), reason)))
            .take(limit)
            .collect()
    }

    /// Overwrite `path` with the failed proxy lines, without reasons
    pub fn write_failures<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_lines(&self.failed_proxies(), path)
    }
}

/// Runs one check per proxy with at most `concurrency` in flight
#[derive(Debug, Clone)]
pub struct Validator {
    concurrency: usize,
}

impl Validator {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Check every proxy and partition the results
    pub async fn validate<C>(&self, proxies: Vec<String>, checker: &C) -> ValidationReport
    where
        C: ProxyCheck + ?Sized,
    {
        let total = proxies.len();
        debug!(total, concurrency = self.concurrency, "validating proxies");

        let results = stream::iter(proxies)
            .map(|proxy| async move { checker.check(&proxy).await })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let report = ValidationReport::from_results(results);
        info!(
            total,
            good = report.good.len(),
            failed = report.failed.len(),
            "validation finished"
        );
        report
    }

    /// Check every proxy on a background task, yielding results as they complete.
    ///
    /// The channel closes once every proxy has been reported.
    pub fn validate_stream<C>(
        &self,
        proxies: Vec<String>,
        checker: Arc<C>,
    ) -> mpsc::Receiver<ProxyCheckResult>
    where
        C: ProxyCheck + 'static,
    {
        let (tx, rx) = mpsc::channel(self.concurrency);
        let concurrency = self.concurrency;

        tokio::spawn(async move {
            let mut results = stream::iter(proxies)
                .map(|proxy| {
                    let checker = Arc::clone(&checker);
                    async move { checker.check(&proxy).await }
                })
                .buffer_unordered(concurrency);

            while let Some(result) = results.next().await {
                if tx.send(result).await.is_err() {
                    debug!("result receiver dropped");
                }
            }
        });

        rx
    }
}
