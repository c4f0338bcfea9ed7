//! Copying a validated list into consumer directories

use crate::proxy::loader::save_lines;
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name used when a target already has it
pub const PREFERRED_FILE_NAME: &str = "proxies.txt";

/// File name used otherwise
pub const FALLBACK_FILE_NAME: &str = "proxy.txt";

/// What happened to one target directory
#[derive(Debug)]
pub enum DistributionStatus {
    Written { file: PathBuf, count: usize },
    NotADirectory,
    WriteFailed { file: PathBuf, error: String },
}

#[derive(Debug)]
pub struct DistributionResult {
    pub target: PathBuf,
    pub status: DistributionStatus,
}

impl DistributionResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, DistributionStatus::Written { .. })
    }
}

/// Pick `proxies.txt` if the directory already has one, else `proxy.txt`
pub fn target_file(dir: &Path) -> PathBuf {
    let preferred = dir.join(PREFERRED_FILE_NAME);
    if preferred.exists() {
        preferred
    } else {
        dir.join(FALLBACK_FILE_NAME)
    }
}

/// Write an independently shuffled copy of `proxies` into every target
pub fn distribute(proxies: &[String], targets: &[PathBuf]) -> Vec<DistributionResult> {
    distribute_with_rng(proxies, targets, &mut rand::thread_rng())
}

pub fn distribute_with_rng<R: Rng + ?Sized>(
    proxies: &[String],
    targets: &[PathBuf],
    rng: &mut R,
) -> Vec<DistributionResult> {
    targets
        .iter()
        .map(|target| DistributionResult {
            target: target.clone(),
            status: write_target(proxies, target, rng),
        })
        .collect()
}

fn write_target<R: Rng + ?Sized>(
    proxies: &[String],
    target: &Path,
    rng: &mut R,
) -> DistributionStatus {
    if !target.is_dir() {
        warn!(target = %target.display(), "skipping invalid target directory");
        return DistributionStatus::NotADirectory;
    }

    let file = target_file(target);
    let mut shuffled = proxies.to_vec();
    shuffled.shuffle(rng);

    match save_lines(&shuffled, &file) {
        Ok(()) => {
            info!(file = %file.display(), count = shuffled.len(), "distributed proxies");
            DistributionStatus::Written {
                file,
                count: shuffled.len(),
            }
        }
        Err(e) => {
            warn!(file = %file.display(), error = %e, "failed to distribute proxies");
            DistributionStatus::WriteFailed {
                file,
                error: format!("{:#}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;

    fn proxies(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("10.0.{}.{}:8080", i / 250, i % 250)).collect()
    }

    fn sorted(mut lines: Vec<String>) -> Vec<String> {
        lines.sort();
        lines
    }

    #[test]
    fn test_each_target_gets_a_permutation() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::create_dir(&a).unwrap();
        fs::create_dir(&b).unwrap();
        let list = proxies(50);

        let results =
            distribute_with_rng(&list, &[a.clone(), b.clone()], &mut StdRng::seed_from_u64(7));
        assert!(results.iter().all(DistributionResult::is_success));

        let read = |dir: &Path| -> Vec<String> {
            fs::read_to_string(dir.join(FALLBACK_FILE_NAME))
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        };
        let in_a = read(&a);
        let in_b = read(&b);

        assert_eq!(in_a.len(), list.len());
        assert_eq!(sorted(in_a.clone()), sorted(list.clone()));
        assert_eq!(sorted(in_b.clone()), sorted(list));
        assert_ne!(in_a, in_b);
    }

    #[test]
    fn test_prefers_existing_proxies_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PREFERRED_FILE_NAME), "old\n").unwrap();

        let results = distribute(&proxies(3), &[dir.path().to_path_buf()]);
        match &results[0].status {
            DistributionStatus::Written { file, count } => {
                assert_eq!(file, &dir.path().join(PREFERRED_FILE_NAME));
                assert_eq!(*count, 3);
            }
            other => panic!("unexpected status {:?}", other),
        }
        assert!(!dir.path().join(FALLBACK_FILE_NAME).exists());
        assert!(!fs::read_to_string(dir.path().join(PREFERRED_FILE_NAME))
            .unwrap()
            .contains("old"));
    }

    #[test]
    fn test_bad_target_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let good = dir.path().join("good");
        fs::create_dir(&good).unwrap();

        let results = distribute(&proxies(4), &[missing, good.clone()]);
        assert!(matches!(results[0].status, DistributionStatus::NotADirectory));
        assert!(results[1].is_success());
        assert!(good.join(FALLBACK_FILE_NAME).exists());
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // a directory squatting on the file name makes the write fail
        fs::create_dir(dir.path().join(PREFERRED_FILE_NAME)).unwrap();

        let results = distribute(&proxies(2), &[dir.path().to_path_buf()]);
        assert!(matches!(
            results[0].status,
            DistributionStatus::WriteFailed { .. }
        ));
    }
}
