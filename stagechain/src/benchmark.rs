//! File-backed benchmarking log.

use crate::errors::ChainError;
use crate::utils::{human_timestamp, Timestamp};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Returns the number of hardware threads available to the process.
#[must_use]
pub fn hardware_concurrency() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Renders the two-line creation banner followed by a blank line.
#[must_use]
pub fn header(created_at: &Timestamp, cores: usize) -> String {
    format!(
        "Benchmarking file created {}\nNumber of Cores: {}\n\n",
        human_timestamp(created_at),
        cores
    )
}

/// Plain-text log of per-run timing information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkLog {
    path: PathBuf,
}

impl BenchmarkLog {
    /// Creates a handle for the log at `path`. Nothing is touched on disk.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the log path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes any previous log and writes a fresh header.
    ///
    /// Returns true if a previous log was removed.
    pub fn reset(&self, created_at: &Timestamp, cores: usize) -> Result<bool, ChainError> {
        let removed = if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| ChainError::environment(&self.path, e))?;
            true
        } else {
            false
        };

        fs::write(&self.path, header(created_at, cores))
            .map_err(|e| ChainError::environment(&self.path, e))?;

        debug!(path = %self.path.display(), removed, "Benchmarking log reset");
        Ok(removed)
    }

    /// Appends one runtime row for `stage`.
    pub fn record(&self, stage: &str, elapsed: Duration) -> Result<(), ChainError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ChainError::environment(&self.path, e))?;

        writeln!(file, "{} runtime: {:.3} seconds", stage, elapsed.as_secs_f64())
            .map_err(|e| ChainError::environment(&self.path, e))
    }
}
