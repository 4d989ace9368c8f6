// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records one CSV row per training epoch.
//
// Output file: checkpoints/metrics.csv
//
//   epoch,train_loss,val_accuracy,skipped_samples,checkpointed
//   1,0.693100,55.000000,0,true
//   2,0.650200,50.000000,1,false
//   ...
//
// The file is truncated when a run starts, so it always
// describes the run whose checkpoint sits next to it.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const CSV_HEADER: &str = "epoch,train_loss,val_accuracy,skipped_samples,checkpointed";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Average cross-entropy loss over the epoch's training batches.
    /// NaN when no batch could be built.
    pub train_loss: f64,

    /// 100 * correct / decoded validation samples
    pub val_accuracy: f64,

    /// Samples (train + validation) that failed to decode this epoch
    pub skipped_samples: usize,

    /// Whether this epoch's weights were written as the new best
    pub checkpointed: bool,
}

impl EpochMetrics {
    pub fn new(
        epoch:           usize,
        train_loss:      f64,
        val_accuracy:    f64,
        skipped_samples: usize,
        checkpointed:    bool,
    ) -> Self {
        Self { epoch, train_loss, val_accuracy, skipped_samples, checkpointed }
    }
}

/// Writes epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Start a fresh `metrics.csv` in `dir` with just the header row.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        let mut f    = fs::File::create(&csv_path)?;
        writeln!(f, "{CSV_HEADER}")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{:.6},{:.6},{},{}",
            m.epoch, m.train_loss, m.val_accuracy, m.skipped_samples, m.checkpointed,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_follow_the_header() {
        let tmp    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::create(tmp.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 0.75, 50.0, 2, true)).unwrap();

        let text  = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![CSV_HEADER, "1,0.750000,50.000000,2,true"]);
    }

    #[test]
    fn a_new_run_truncates_old_rows() {
        let tmp = tempfile::tempdir().unwrap();
        MetricsLogger::create(tmp.path()).unwrap()
            .log(&EpochMetrics::new(1, 1.0, 10.0, 0, true)).unwrap();

        let logger = MetricsLogger::create(tmp.path()).unwrap();
        let text   = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
