//! On-disk outputs of a training run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::checkpoint::BestCheckpoint;
use crate::history::LossHistory;
use crate::{FusionError, Result};

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// `at` as `YYYYmmdd-HHMMSS`.
pub fn run_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// `fusion_<timestamp>_epoch_<epoch>`
pub fn artifact_stem(timestamp: &str, best_epoch: usize) -> String {
    format!("fusion_{timestamp}_epoch_{best_epoch}")
}

/// Where a run's checkpoint and loss table were written.
#[derive(Debug, Clone, PartialEq)]
pub struct RunArtifacts {
    pub checkpoint: PathBuf,
    pub losses: PathBuf,
}

impl RunArtifacts {
    /// Write the best snapshot and the loss table under a shared stem.
    ///
    /// The loss table is written even when no epoch produced a finite
    /// validation loss; it then lands in `fusion_<timestamp>_diverged.csv`
    /// and the call fails with [`FusionError::Diverged`].
    pub fn write(
        checkpoint_dir: &Path,
        loss_dir: &Path,
        timestamp: &str,
        best: &BestCheckpoint,
        history: &LossHistory,
    ) -> Result<Self> {
        std::fs::create_dir_all(loss_dir)?;
        let Some(epoch) = best.epoch() else {
            let losses = loss_dir.join(format!("fusion_{timestamp}_diverged.csv"));
            history.write_csv(&losses)?;
            warn!("No finite validation loss; losses saved to {}", losses.display());
            return Err(FusionError::Diverged(losses));
        };
        let stem = artifact_stem(timestamp, epoch);

        std::fs::create_dir_all(checkpoint_dir)?;

        let checkpoint = checkpoint_dir.join(format!("{stem}.safetensors"));
        best.save(&checkpoint)?;
        info!("Saved best checkpoint to {}", checkpoint.display());

        let losses = loss_dir.join(format!("{stem}.csv"));
        history.write_csv(&losses)?;
        info!("Saved losses to {}", losses.display());

        Ok(Self { checkpoint, losses })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_format() {
        assert_eq!(
            artifact_stem("20241210-043903", 17),
            "fusion_20241210-043903_epoch_17"
        );
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = run_timestamp(&Local::now());
        assert_eq!(ts.len(), 15);
        assert_eq!(&ts[8..9], "-");
        assert!(ts.chars().filter(|c| *c != '-').all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_losses_survive_a_diverged_run() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoints = dir.path().join("checkpoints");
        let losses = dir.path().join("losses");
        let history = LossHistory {
            train: vec![f64::NAN, f64::NAN],
            val: vec![f64::NAN, f64::NAN],
        };

        let err = RunArtifacts::write(
            &checkpoints,
            &losses,
            "20240101-000000",
            &BestCheckpoint::empty(),
            &history,
        )
        .unwrap_err();

        let expected = losses.join("fusion_20240101-000000_diverged.csv");
        assert!(matches!(&err, FusionError::Diverged(path) if *path == expected));
        assert_eq!(LossHistory::read_csv(&expected).unwrap().len(), 2);
        assert!(!checkpoints.exists());
    }
}
