// ============================================================
// Layer 6 — Training Log
// ============================================================
// Appends one CSV row every `logging_steps` optimiser steps.
//
// Output file: <output_dir>/training_log.csv
//
// Example:
//   step,epoch,loss,learning_rate
//   50,1,3.412871,0.000097
//   100,1,3.198004,0.000093
//
// The loss column is the mean over the steps since the previous
// row, so it is smoother than a single batch loss.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

pub const LOG_FILE: &str = "training_log.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    /// Optimiser steps taken so far (starts at 1)
    pub step: usize,
    pub epoch: usize,
    /// Mean training loss over the logging window
    pub loss: f64,
    pub learning_rate: f64,
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Start a fresh log in `dir`, replacing one from an earlier run.
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join(LOG_FILE);
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "step,epoch,loss,learning_rate")?;
        tracing::debug!("Created training log: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &StepMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{},{},{:.6},{:.8}", m.step, m.epoch, m.loss, m.learning_rate)?;
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
    fn test_header_then_rows() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::create(dir.path()).unwrap();
        logger.log(&StepMetrics { step: 50, epoch: 1, loss: 3.5, learning_rate: 1e-4 }).unwrap();
        logger.log(&StepMetrics { step: 100, epoch: 2, loss: 3.25, learning_rate: 5e-5 }).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "step,epoch,loss,learning_rate");
        assert_eq!(lines[1], "50,1,3.500000,0.00010000");
        assert_eq!(lines[2], "100,2,3.250000,0.00005000");
    }

    #[test]
    fn test_new_run_replaces_old_log() {
        let dir = tempfile::tempdir().unwrap();
        let first = MetricsLogger::create(dir.path()).unwrap();
        first.log(&StepMetrics { step: 1, epoch: 1, loss: 1.0, learning_rate: 0.1 }).unwrap();

        let second = MetricsLogger::create(dir.path()).unwrap();
        let csv = fs::read_to_string(second.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
