//! Configuration for the fusion training loop.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{FusionError, Result};

/// Hyperparameters of one fusion training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of passes over the training split (default: 100)
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    /// Examples per mini-batch for every split (default: 64)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Adam step size (default: 1e-3)
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// L2 penalty added to the gradient (default: 1e-3)
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f64,

    /// Hidden layer widths of the fusion MLP (default: [256, 64])
    #[serde(default = "default_hidden_dims")]
    pub hidden_dims: Vec<usize>,
}

fn default_epochs()        -> usize      { 100 }
fn default_batch_size()    -> usize      { 64 }
fn default_learning_rate() -> f64        { 1e-3 }
fn default_weight_decay()  -> f64        { 1e-3 }
fn default_hidden_dims()   -> Vec<usize> { vec![256, 64] }

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            weight_decay: default_weight_decay(),
            hidden_dims: default_hidden_dims(),
        }
    }
}

impl TrainingConfig {
    /// Set the number of epochs.
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the MLP hidden widths.
    pub fn with_hidden_dims(mut self, dims: Vec<usize>) -> Self {
        self.hidden_dims = dims;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(FusionError::Config("epochs must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(FusionError::Config("batch_size must be at least 1".to_string()));
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(FusionError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.weight_decay < 0.0 {
            return Err(FusionError::Config(format!(
                "weight_decay must not be negative, got {}",
                self.weight_decay
            )));
        }
        if self.hidden_dims.contains(&0) {
            return Err(FusionError::Config("hidden widths must be positive".to_string()));
        }
        Ok(())
    }
}

/// Directories the run reads from and writes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPaths {
    #[serde(default = "default_embed_dir")]
    pub embed_dir: PathBuf,
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,
    #[serde(default = "default_loss_dir")]
    pub loss_dir: PathBuf,
}

fn default_embed_dir()      -> PathBuf { PathBuf::from("./data/embeddings") }
fn default_checkpoint_dir() -> PathBuf { PathBuf::from("./checkpoints") }
fn default_loss_dir()       -> PathBuf { PathBuf::from("./losses") }

impl Default for RunPaths {
    fn default() -> Self {
        Self {
            embed_dir: default_embed_dir(),
            checkpoint_dir: default_checkpoint_dir(),
            loss_dir: default_loss_dir(),
        }
    }
}
