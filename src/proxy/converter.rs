//! Turning raw provider lines into canonical proxy URLs

use crate::proxy::loader::save_lines;
use crate::proxy::models::ProxyType;
use crate::proxy::parser::{Normalized, ProxyParser};
use crate::Result;
use anyhow::{bail, Context};
use std::fs;
use std::path::Path;
use tracing::info;

/// Result of converting a raw list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionReport {
    /// Canonical `scheme://[user:pass@]host:port` lines, in input order
    pub converted: Vec<String>,
    /// Entries matching no known format
    pub unparseable: Vec<String>,
}

/// Convert raw text into canonical URLs, defaulting the scheme to `default_type`
pub fn convert_text(content: &str, default_type: ProxyType) -> ConversionReport {
    let mut report = ConversionReport::default();

    for entry in content.lines().flat_map(ProxyParser::split_concatenated) {
        match ProxyParser::normalize_line(&entry, default_type.clone()) {
            Normalized::Proxy(proxy) => report.converted.push(proxy.url()),
            Normalized::Unparseable(raw) => report.unparseable.push(raw),
            Normalized::Skip => {}
        }
    }

    report
}

/// Convert `src` into `dst` as HTTP proxy URLs, then empty `src`.
///
/// Fails when `src` is missing. When nothing converts, neither file is touched.
pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> Result<ConversionReport> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    if !src.exists() {
        bail!("{} not found", src.display());
    }

    let content =
        fs::read_to_string(src).with_context(|| format!("failed to read {}", src.display()))?;
    let report = convert_text(&content, ProxyType::Http);
    if report.converted.is_empty() {
        return Ok(report);
    }

    save_lines(&report.converted, dst)?;
    fs::write(src, "").with_context(|| format!("failed to empty {}", src.display()))?;

    info!(
        converted = report.converted.len(),
        unparseable = report.unparseable.len(),
        "converted raw proxy list"
    );
    Ok(report)
}
