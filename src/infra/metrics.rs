// ============================================================
// Layer 6: Metrics Logger
// ============================================================
// Records per-epoch training metrics to a CSV file.
//
// Metrics recorded per epoch:
//   - epoch:        the epoch number (1, 2, 3, ...)
//   - train_loss:   mean masked cross-entropy over training batches
//   - val_loss:     same on the held-out split (empty if none)
//   - checkpointed: whether this epoch's weights were saved
//
// Output file: checkpoints/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,val_loss,checkpointed
//   1,4.812300,4.701200,true
//   2,4.133000,4.090100,true
//   3,4.150200,4.120000,false

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::ml::trainer::EpochSummary;

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:        usize,
    pub train_loss:   f64,
    pub val_loss:     Option<f64>,
    pub checkpointed: bool,
}

impl EpochMetrics {
    pub fn to_csv_row(&self) -> String {
        let val = self.val_loss.map(|v| format!("{v:.6}")).unwrap_or_default();
        format!("{},{:.6},{},{}", self.epoch, self.train_loss, val, self.checkpointed)
    }
}

impl From<&EpochSummary> for EpochMetrics {
    fn from(s: &EpochSummary) -> Self {
        Self {
            epoch:        s.epoch,
            train_loss:   s.train_loss,
            val_loss:     s.val_loss,
            checkpointed: s.checkpointed,
        }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Start a fresh metrics.csv in `dir`, replacing any previous run's.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "epoch,train_loss,val_loss,checkpointed")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        writeln!(f, "{}", m.to_csv_row())?;

        tracing::debug!("Logged epoch {} metrics", m.epoch);
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
    fn test_missing_val_loss_is_an_empty_column() {
        let m = EpochMetrics { epoch: 3, train_loss: 2.5, val_loss: None, checkpointed: false };
        assert_eq!(m.to_csv_row(), "3,2.500000,,false");
    }

    #[test]
    fn test_rows_are_appended_under_header() {
        let dir = std::env::temp_dir().join(format!("nmt_metrics_{}", std::process::id()));
        let logger = MetricsLogger::new(&dir).unwrap();
        logger
            .log(&EpochMetrics { epoch: 1, train_loss: 4.0, val_loss: Some(4.5), checkpointed: true })
            .unwrap();
        logger
            .log(&EpochMetrics { epoch: 2, train_loss: 4.2, val_loss: Some(4.4), checkpointed: false })
            .unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "epoch,train_loss,val_loss,checkpointed");
        assert_eq!(lines[1], "1,4.000000,4.500000,true");
        assert_eq!(lines.len(), 3);

        // a new logger starts over
        let again = MetricsLogger::new(&dir).unwrap();
        assert_eq!(fs::read_to_string(again.csv_path()).unwrap().lines().count(), 1);

        fs::remove_dir_all(&dir).ok();
    }
}
