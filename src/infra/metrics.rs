// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records validation metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:       the epoch number (1, 2, 3, ...)
//   - train_loss:  average span loss on the training set
//   - val_loss:    average span loss on the validation set
//   - start_acc:   fraction of start positions predicted exactly
//   - end_acc:     fraction of end positions predicted exactly
//   - exact_match: fraction of decoded spans equal to the gold span
//
// Output file: checkpoints/metrics.csv
//
//   epoch,train_loss,val_loss,start_acc,end_acc,exact_match
//   1,3.124500,3.089200,0.123000,0.118000,0.054000
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

const CSV_HEADER: &str = "epoch,train_loss,val_loss,start_acc,end_acc,exact_match";

/// Running counts for one validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpanAccuracy {
    pub total:         usize,
    pub correct_start: usize,
    pub correct_end:   usize,
    pub exact:         usize,
}

impl SpanAccuracy {
    /// Count one prediction against its gold span.
    pub fn record(&mut self, predicted: Option<(usize, usize)>, gold: (usize, usize)) {
        self.total += 1;
        if let Some((start, end)) = predicted {
            self.correct_start += usize::from(start == gold.0);
            self.correct_end   += usize::from(end == gold.1);
            self.exact         += usize::from((start, end) == gold);
        }
    }

    fn ratio(&self, count: usize) -> f64 {
        if self.total == 0 { 0.0 } else { count as f64 / self.total as f64 }
    }

    pub fn start_acc(&self)   -> f64 { self.ratio(self.correct_start) }
    pub fn end_acc(&self)     -> f64 { self.ratio(self.correct_end) }
    pub fn exact_match(&self) -> f64 { self.ratio(self.exact) }
}

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:       usize,
    pub train_loss:  f64,
    pub val_loss:    f64,
    pub start_acc:   f64,
    pub end_acc:     f64,
    pub exact_match: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, accuracy: &SpanAccuracy) -> Self {
        Self {
            epoch,
            train_loss,
            val_loss,
            start_acc:   accuracy.start_acc(),
            end_acc:     accuracy.end_acc(),
            exact_match: accuracy.exact_match(),
        }
    }

    /// Returns true if this epoch improved over the previous best val_loss
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

/// Appends epoch metrics to `metrics.csv` in the checkpoint directory.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{CSV_HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.train_loss, m.val_loss, m.start_acc, m.end_acc, m.exact_match,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
