//! Reading and rewriting the plain-text lists the tool works from

use crate::Result;
use anyhow::Context;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const API_LIST_HEADER: &str = "# Put your API URLs here, one per line";

/// Proxy lines read from a source file after deduplication
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceList {
    /// Sorted, unique, non-comment lines
    pub proxies: Vec<String>,
    pub duplicates_removed: usize,
    /// False when the file did not exist
    pub existed: bool,
}

/// Load `path`, drop duplicates and rewrite it sorted.
///
/// A missing file yields an empty list with `existed == false`. Comment lines
/// survive in the rewritten file but are not returned.
pub fn load_and_deduplicate<P: AsRef<Path>>(path: P) -> Result<SourceList> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = %path.display(), "proxy source not found");
        return Ok(SourceList::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let lines: Vec<&str> = non_empty_lines(&content).collect();
    let unique: BTreeSet<&str> = lines.iter().copied().collect();
    let duplicates_removed = lines.len() - unique.len();

    let sorted: Vec<String> = unique.into_iter().map(str::to_string).collect();
    save_lines(&sorted, path)?;

    if duplicates_removed > 0 {
        info!(path = %path.display(), duplicates_removed, "removed duplicate proxies");
    }

    Ok(SourceList {
        proxies: sorted.into_iter().filter(|l| !l.starts_with('#')).collect(),
        duplicates_removed,
        existed: true,
    })
}

/// Target directories listed in `path` that currently exist
pub fn load_paths<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(non_empty_lines(&content)
        .filter(|line| !line.starts_with('#'))
        .map(PathBuf::from)
        .filter(|dir| {
            let is_dir = dir.is_dir();
            if !is_dir {
                debug!(path = %dir.display(), "ignoring missing target directory");
            }
            is_dir
        })
        .collect())
}

/// Download URLs listed in `path`; a missing file is created with a hint line
pub fn load_api_urls<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        fs::write(path, format!("{}\n", API_LIST_HEADER))
            .with_context(|| format!("failed to create {}", path.display()))?;
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(non_empty_lines(&content)
        .filter(|line| !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Copy `src` to `dst`; returns false when there was nothing to back up
pub fn backup_file<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> Result<bool> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    if !src.exists() {
        return Ok(false);
    }

    fs::copy(src, dst)
        .with_context(|| format!("failed to back up {} to {}", src.display(), dst.display()))?;
    Ok(true)
}

/// Overwrite `path` with one newline-terminated entry per line
pub fn save_lines<P: AsRef<Path>, S: AsRef<str>>(lines: &[S], path: P) -> Result<()> {
    let path = path.as_ref();
    let content: String = lines
        .iter()
        .map(|line| format!("{}\n", line.as_ref()))
        .collect();

    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Read a list written by `save_lines`, without rewriting it
pub fn read_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(non_empty_lines(&content)
        .filter(|line| !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn non_empty_lines(content: &str) -> impl Iterator<Item = &str> {
    content.lines().map(str::trim).filter(|line| !line.is_empty())
}
