// ============================================================
// Layer 6 — Training Metrics
// ============================================================
// Per-epoch metrics for the RNN trainer, kept in memory as a
// TrainingHistory and written to CSV for later analysis.
//
// Metrics recorded per epoch:
//   - epoch:          the epoch number (1, 2, 3, ...)
//   - train_loss:     mean sparse cross-entropy over training batches
//   - train_accuracy: fraction of training examples classified correctly
//   - val_loss:       mean sparse cross-entropy on the validation set
//   - val_accuracy:   fraction of validation examples classified correctly
//
// val_accuracy is what early stopping watches.
//
// Example CSV output:
//   epoch,train_loss,train_accuracy,val_loss,val_accuracy
//   1,3.124500,0.123000,3.089200,0.118000
//   2,2.890100,0.184000,2.854300,0.172000

use anyhow::Result;
use std::{
    fs::{self, File},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

/// One row of metrics for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:          usize,
    pub train_loss:     f64,
    pub train_accuracy: f64,
    pub val_loss:       f64,
    pub val_accuracy:   f64,
}

impl EpochMetrics {
    pub fn new(
        epoch:          usize,
        train_loss:     f64,
        train_accuracy: f64,
        val_loss:       f64,
        val_accuracy:   f64,
    ) -> Self {
        Self { epoch, train_loss, train_accuracy, val_loss, val_accuracy }
    }

    /// Strictly better validation accuracy than `best`
    pub fn is_improvement(&self, best_val_accuracy: f64) -> bool {
        self.val_accuracy > best_val_accuracy
    }
}

/// Every epoch's metrics, in order, plus why training ended
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs:         Vec<EpochMetrics>,
    pub stopped_early:  bool,
}

impl TrainingHistory {
    pub fn push(&mut self, m: EpochMetrics) {
        self.epochs.push(m);
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn best_val_accuracy(&self) -> Option<f64> {
        self.epochs.iter().map(|m| m.val_accuracy).reduce(f64::max)
    }

    /// One metric across all epochs, e.g. for plotting
    pub fn series(&self, pick: impl Fn(&EpochMetrics) -> f64) -> Vec<f64> {
        self.epochs.iter().map(pick).collect()
    }
}

/// Writes a TrainingHistory as CSV.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self { csv_path: csv_path.into() }
    }

    /// Overwrite the CSV with the full history
    pub fn write(&self, history: &TrainingHistory) -> Result<()> {
        if history.is_empty() {
            tracing::warn!("No epochs recorded; '{}' will hold only a header", self.csv_path.display());
        }
        if let Some(parent) = self.csv_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut f = File::create(&self.csv_path)?;
        writeln!(f, "epoch,train_loss,train_accuracy,val_loss,val_accuracy")?;
        for m in &history.epochs {
            writeln!(
                f,
                "{},{:.6},{:.6},{:.6},{:.6}",
                m.epoch, m.train_loss, m.train_accuracy, m.val_loss, m.val_accuracy,
            )?;
        }

        tracing::debug!(
            "Wrote {} epochs of metrics to '{}'",
            history.len(),
            self.csv_path.display()
        );
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 2.5, 0.3, 2.3, 0.4);
        assert!(m.is_improvement(0.3));
        // equal is not an improvement
        assert!(!m.is_improvement(0.4));
    }

    #[test]
    fn test_history_series_and_best() {
        let mut h = TrainingHistory::default();
        h.push(EpochMetrics::new(1, 2.0, 0.1, 2.1, 0.2));
        h.push(EpochMetrics::new(2, 1.0, 0.5, 1.9, 0.6));
        assert_eq!(h.series(|m| m.train_loss), vec![2.0, 1.0]);
        assert_eq!(h.best_val_accuracy(), Some(0.6));
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path().join("history.csv"));
        let mut h = TrainingHistory::default();
        h.push(EpochMetrics::new(1, 2.0, 0.1, 2.1, 0.2));
        logger.write(&h).unwrap();

        let body = fs::read_to_string(dir.path().join("history.csv")).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("1,2.000000,0.100000"));
    }
}
