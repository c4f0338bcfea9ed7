//! End-to-end workflows: download, convert, validate and distribute

use crate::config::Settings;
use crate::console;
use crate::proxy::validator::DIAGNOSTIC_ROWS;
use crate::proxy::{
    converter, distributor, downloader, loader, ApiDownloader, ConversionReport,
    DistributionResult, ProxyCheck, ProxyCheckResult, ProxyChecker, ValidationReport, Validator,
};
use crate::tui::CheckProgressApp;
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// How a full run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// The proxy file was missing or empty
    NoProxies,
    NoWorkingProxies(ValidationReport),
    /// Distribution was requested but no target directory exists
    NoTargets(ValidationReport),
    Distributed {
        report: ValidationReport,
        results: Vec<DistributionResult>,
    },
    Saved {
        report: ValidationReport,
        path: PathBuf,
    },
}

/// Runs the workflows against the files named in [`Settings`]
pub struct Pipeline {
    settings: Settings,
}

impl Pipeline {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Download every API list into the raw list file; returns the number of lines saved
    pub async fn download(&self) -> Result<usize> {
        let files = &self.settings.files;
        let urls = loader::load_api_urls(&files.apilist)?;
        if urls.is_empty() {
            console::error(&format!("'{}' is empty or missing.", files.apilist.display()));
            console::warn("Add your API URLs to it, one per line.");
            return Ok(0);
        }

        console::step(&format!("Downloading from {} API URLs...", urls.len()));
        let api = ApiDownloader::with_config(self.settings.downloader_config())?;
        let results = api.download_all(&urls).await;
        for result in &results {
            match &result.error {
                None => console::info(&format!(
                    "  {} lines from {}",
                    result.lines.len(),
                    result.source
                )),
                Some(error) => console::warn(&format!("  {} failed: {}", result.source, error)),
            }
        }

        let merged = downloader::merge_unique(&results);
        if merged.is_empty() {
            console::warn("No proxies were downloaded from any API.");
            return Ok(0);
        }

        loader::save_lines(&merged, &files.proxylist)?;
        console::success(&format!(
            "Saved {} new proxies to '{}'",
            merged.len(),
            files.proxylist.display()
        ));
        Ok(merged.len())
    }

    /// Convert the raw list into canonical URLs in the proxy file
    pub fn convert(&self) -> Result<ConversionReport> {
        let files = &self.settings.files;
        let report = converter::convert_file(&files.proxylist, &files.proxy)?;

        for raw in &report.unparseable {
            console::warn(&format!("Unrecognized format: {}", raw));
        }
        if report.converted.is_empty() {
            console::error("No proxies were converted.");
        } else {
            console::success(&format!(
                "Moved {} proxies to '{}'; '{}' emptied.",
                report.converted.len(),
                files.proxy.display(),
                files.proxylist.display()
            ));
        }
        Ok(report)
    }

    /// Validate the proxy file and save working proxies to the success file
    pub async fn check(&self, live: bool) -> Result<ValidationReport> {
        let checker = Arc::new(ProxyChecker::with_config(self.settings.checker_config()));
        self.check_with(checker, live).await
    }

    /// Leaves the success and fail files alone when there is nothing to check
    pub async fn check_with<C>(&self, checker: Arc<C>, live: bool) -> Result<ValidationReport>
    where
        C: ProxyCheck + 'static,
    {
        let proxies = self.load_proxies()?;
        if proxies.is_empty() {
            console::error(&format!(
                "Nothing to check: '{}' is empty.",
                self.settings.files.proxy.display()
            ));
            return Ok(ValidationReport::default());
        }

        let report = self.validate_with(proxies, checker, live).await?;
        self.save_good(&report)?;
        Ok(report)
    }

    /// Backup, load, validate, then distribute or save
    pub async fn run(&self, distribute: bool, live: bool) -> Result<RunOutcome> {
        let checker = Arc::new(ProxyChecker::with_config(self.settings.checker_config()));
        self.run_with(checker, distribute, live).await
    }

    pub async fn run_with<C>(&self, checker: Arc<C>, distribute: bool, live: bool) -> Result<RunOutcome>
    where
        C: ProxyCheck + 'static,
    {
        let files = &self.settings.files;

        console::step("Step 1: backup & clean proxies...");
        if loader::backup_file(&files.proxy, &files.backup)? {
            console::success(&format!("Backup created: '{}'", files.backup.display()));
        }
        let proxies = self.load_proxies()?;
        if proxies.is_empty() {
            console::error(&format!(
                "Stopped: '{}' is empty.",
                files.proxy.display()
            ));
            return Ok(RunOutcome::NoProxies);
        }
        console::info(&format!("Ready to test {} unique proxies.", proxies.len()));
        console::rule();

        console::step("Step 2: validating...");
        let report = self.validate_with(proxies, checker, live).await?;
        if report.good.is_empty() {
            console::error("Stopped: no working proxies.");
            return Ok(RunOutcome::NoWorkingProxies(report));
        }
        console::success(&format!("Found {} working proxies.", report.good.len()));
        console::rule();

        if !distribute {
            console::step("Step 3: saving working proxies...");
            let path = self.save_good(&report)?;
            return Ok(RunOutcome::Saved { report, path });
        }

        console::step("Step 3: distributing...");
        let targets = loader::load_paths(&files.paths)?;
        if targets.is_empty() {
            console::error(&format!(
                "Stopped: '{}' lists no existing directory.",
                files.paths.display()
            ));
            return Ok(RunOutcome::NoTargets(report));
        }
        let results = self.distribute_to(&report.good_proxies(), &targets);
        console::success("All tasks finished!");
        Ok(RunOutcome::Distributed { report, results })
    }

    /// Distribute an already validated list file to every target directory
    pub fn distribute_file<P: AsRef<Path>>(&self, input: P) -> Result<Vec<DistributionResult>> {
        let proxies = loader::read_lines(input)?;
        let targets = loader::load_paths(&self.settings.files.paths)?;
        if proxies.is_empty() || targets.is_empty() {
            console::warn("Nothing to distribute.");
            return Ok(Vec::new());
        }
        Ok(self.distribute_to(&proxies, &targets))
    }

    fn distribute_to(&self, proxies: &[String], targets: &[PathBuf]) -> Vec<DistributionResult> {
        console::info(&format!(
            "Distributing {} working proxies to {} targets...",
            proxies.len(),
            targets.len()
        ));
        let results = distributor::distribute(proxies, targets);
        console::distribution(&results);
        results
    }

    fn load_proxies(&self) -> Result<Vec<String>> {
        let path = &self.settings.files.proxy;
        let list = loader::load_and_deduplicate(path)?;
        if !list.existed {
            console::warn(&format!("'{}' not found.", path.display()));
        }
        if list.duplicates_removed > 0 {
            console::warn(&format!("Removed {} duplicates.", list.duplicates_removed));
        }
        Ok(list.proxies)
    }

    async fn validate_with<C>(
        &self,
        proxies: Vec<String>,
        checker: Arc<C>,
        live: bool,
    ) -> Result<ValidationReport>
    where
        C: ProxyCheck + 'static,
    {
        let total = proxies.len();
        let workers = checker.concurrency().unwrap_or(self.settings.check.workers);
        let validator = Validator::new(workers);
        let rx = validator.validate_stream(proxies, checker);

        let results = if live {
            CheckProgressApp::new(rx, total).run().await?
        } else {
            collect_with_progress(rx, total).await
        };
        let report = ValidationReport::from_results(results);

        let fail_path = &self.settings.files.fail;
        report.write_failures(fail_path)?;
        if !report.failed.is_empty() {
            console::warn(&format!(
                "Saved {} failed proxies to '{}'",
                report.failed.len(),
                fail_path.display()
            ));
            console::diagnostics(&report, DIAGNOSTIC_ROWS);
        }
        info!(good = report.good.len(), failed = report.failed.len(), "check complete");
        Ok(report)
    }

    fn save_good(&self, report: &ValidationReport) -> Result<PathBuf> {
        let path = self.settings.files.success.clone();
        loader::save_lines(&report.good_proxies(), &path)?;
        console::success(&format!(
            "Saved {} working proxies to '{}'",
            report.good.len(),
            path.display()
        ));
        Ok(path)
    }
}

async fn collect_with_progress(
    mut rx: mpsc::Receiver<ProxyCheckResult>,
    total: usize,
) -> Vec<ProxyCheckResult> {
    let mut results = Vec::with_capacity(total);
    let mut good = 0;
    while let Some(result) = rx.recv().await {
        if result.is_working() {
            good += 1;
        }
        results.push(result);
        console::progress(results.len(), total, good, results.len() - good);
    }
    results
}
