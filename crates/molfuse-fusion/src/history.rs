//! Per-epoch loss sequences and their CSV form.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{FusionError, Result};

#[derive(Debug, Serialize, Deserialize)]
struct LossRow {
    train_loss: f64,
    val_loss: f64,
}

/// Train and validation loss, one entry per completed epoch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossHistory {
    pub train: Vec<f64>,
    pub val: Vec<f64>,
}

impl LossHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, train_loss: f64, val_loss: f64) {
        self.train.push(train_loss);
        self.val.push(val_loss);
    }

    pub fn len(&self) -> usize {
        self.train.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train.is_empty()
    }

    /// Lowest validation loss seen up to each epoch.
    pub fn running_min_val(&self) -> Vec<f64> {
        let mut best = f64::INFINITY;
        self.val
            .iter()
            .map(|&v| {
                if v < best {
                    best = v;
                }
                best
            })
            .collect()
    }

    /// First epoch holding the lowest validation loss.
    pub fn best_epoch(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (epoch, &v) in self.val.iter().enumerate() {
            if v < best.map_or(f64::INFINITY, |(_, b)| b) {
                best = Some((epoch, v));
            }
        }
        best.map(|(epoch, _)| epoch)
    }

    /// Write `train_loss,val_loss` rows to `path`.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        writer.write_record(["train_loss", "val_loss"])?;
        for (&train_loss, &val_loss) in self.train.iter().zip(&self.val) {
            writer.serialize(LossRow {
                train_loss,
                val_loss,
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        if headers.iter().collect::<Vec<_>>() != ["train_loss", "val_loss"] {
            return Err(FusionError::Config(format!(
                "unexpected loss table header in {}",
                path.display()
            )));
        }
        let mut history = Self::new();
        for row in reader.deserialize() {
            let row: LossRow = row?;
            history.push(row.train_loss, row.val_loss);
        }
        Ok(history)
    }
}
