//! Error types for the fusion trainer.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FusionError>;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Invalid training configuration: {0}")]
    Config(String),

    #[error("Embedding source error: {0}")]
    Embeddings(String),

    #[error("Split '{0}' is empty")]
    EmptySplit(&'static str),

    #[error("No epoch produced a finite validation loss; losses written to {}", .0.display())]
    Diverged(std::path::PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error(transparent)]
    Common(#[from] molfuse_common::CommonError),
}
