//! Batch output of run results with collision-free file names.
//!
//! A result is written as `<name>.tmp` under an exclusively created
//! `<name>.lock` and renamed into place, so concurrent runs sharing an output
//! directory never overwrite or read each other's partial files.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::schema::{ReportingConfig, RunResult};

/// Attempts at finding a free file name.
pub const MAX_ATTEMPTS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("No free result file name after {0} attempts")]
    NamesExhausted(usize),
    #[error("Failed to rename {from:?} to {to:?}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

fn hostname() -> String {
    let raw = std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .or_else(|| {
            fs::read_to_string("/etc/hostname")
                .ok()
                .filter(|h| !h.trim().is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string());
    raw.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
        .collect()
}

/// Writes run results into one directory.
#[derive(Debug, Clone)]
pub struct BatchWriter {
    dir: PathBuf,
    prefix: String,
}

impl BatchWriter {
    pub fn new<P: AsRef<Path>>(dir: P, prefix: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            prefix: prefix.to_string(),
        }
    }

    pub fn from_config(config: &ReportingConfig) -> Self {
        Self::new(config.output_dir.as_deref().unwrap_or("."), &config.prefix)
    }

    /// `{prefix}{secs}.{micros}-{host}-{pid}-{suffix}.json`
    pub fn candidate_name(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect();
        format!(
            "{}{}.{:06}-{}-{}-{}.json",
            self.prefix,
            now.as_secs(),
            now.subsec_micros(),
            hostname(),
            std::process::id(),
            suffix
        )
    }

    /// Write `result` under a fresh name and return its path.
    pub fn write(&self, result: &RunResult) -> Result<PathBuf, PersistenceError> {
        self.write_with_names(result, || self.candidate_name())
    }

    pub(crate) fn write_with_names(
        &self,
        result: &RunResult,
        mut next_name: impl FnMut() -> String,
    ) -> Result<PathBuf, PersistenceError> {
        let json = serde_json::to_string_pretty(result)?;
        fs::create_dir_all(&self.dir)?;

        for _ in 0..MAX_ATTEMPTS {
            let name = next_name();
            let target = self.dir.join(&name);
            let lock = self.dir.join(format!("{name}.lock"));
            if target.exists() {
                continue;
            }
            match OpenOptions::new().write(true).create_new(true).open(&lock) {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
            if target.exists() {
                release(&lock);
                continue;
            }
            let outcome = self.write_locked(&name, &target, &json);
            release(&lock);
            return outcome;
        }
        Err(PersistenceError::NamesExhausted(MAX_ATTEMPTS))
    }

    fn write_locked(&self, name: &str, target: &Path, json: &str) -> Result<PathBuf, PersistenceError> {
        let tmp = self.dir.join(format!("{name}.tmp"));
        let mut file = fs::File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);
        if let Err(source) = fs::rename(&tmp, target) {
            let _ = fs::remove_file(&tmp);
            return Err(PersistenceError::Rename {
                from: tmp,
                to: target.to_path_buf(),
                source,
            });
        }
        log::info!("Wrote run result to {}", target.display());
        Ok(target.to_path_buf())
    }
}

fn release(lock: &Path) {
    if let Err(e) = fs::remove_file(lock) {
        log::warn!("Failed to remove lock file {}: {e}", lock.display());
    }
}

/// Read a result written by [`BatchWriter`].
pub fn load_result<P: AsRef<Path>>(path: P) -> Result<RunResult, PersistenceError> {
    let content = fs::read_to_string(path)?;
    let mut result: RunResult = serde_json::from_str(&content)?;
    result.output_path = None;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::representation::Gene;
    use crate::schema::{RunConfig, Solution, StatisticsHistory, StopReason, Timings};
    use tempfile::TempDir;

    fn result() -> RunResult {
        RunResult {
            problem: "Test".to_string(),
            statistics: StatisticsHistory::default(),
            final_fitness: None,
            solution: Solution {
                fitness: 1.0,
                value: 1.0,
                gene: Gene::binary(vec![true, false]),
                phenotype: None,
                ties: 1,
                equally_best: Vec::new(),
            },
            failures: 0,
            config: RunConfig::default(),
            seed: 7,
            generations: 0,
            stop_reason: StopReason::MaxGenerations,
            timings: Timings::default(),
            output_path: None,
        }
    }

    #[test]
    fn test_write_and_load() {
        let dir = TempDir::new().unwrap();
        let writer = BatchWriter::new(dir.path(), "run-");
        let path = writer.write(&result()).unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("run-"));
        assert!(name.ends_with(".json"));

        let loaded = load_result(&path).unwrap();
        assert_eq!(loaded.seed, 7);
        assert_eq!(loaded.solution.gene, Gene::binary(vec![true, false]));

        // Lock and temporary files are gone.
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_candidate_name_shape() {
        let writer = BatchWriter::new(".", "p-");
        let name = writer.candidate_name();
        let stem = name.strip_prefix("p-").unwrap().strip_suffix(".json").unwrap();
        let parts: Vec<&str> = stem.rsplitn(3, '-').collect();
        assert_eq!(parts[0].len(), 6);
        assert_eq!(parts[1], std::process::id().to_string());
        let (secs, micros) = stem.split_once('-').unwrap().0.split_once('.').unwrap();
        assert!(secs.parse::<u64>().is_ok());
        assert_eq!(micros.len(), 6);
        assert_ne!(writer.candidate_name(), name);
    }

    #[test]
    fn test_existing_names_exhausted() {
        let dir = TempDir::new().unwrap();
        let writer = BatchWriter::new(dir.path(), "");
        fs::write(dir.path().join("taken.json"), "{}").unwrap();
        let outcome = writer.write_with_names(&result(), || "taken.json".to_string());
        assert!(matches!(outcome, Err(PersistenceError::NamesExhausted(MAX_ATTEMPTS))));
    }

    #[test]
    fn test_locked_name_skipped() {
        let dir = TempDir::new().unwrap();
        let writer = BatchWriter::new(dir.path(), "");
        fs::write(dir.path().join("a.json.lock"), "").unwrap();
        let mut names = vec!["b.json".to_string(), "a.json".to_string()];
        let path = writer
            .write_with_names(&result(), || names.pop().unwrap())
            .unwrap();
        assert_eq!(path, dir.path().join("b.json"));
        assert!(!dir.path().join("a.json").exists());
    }
}
