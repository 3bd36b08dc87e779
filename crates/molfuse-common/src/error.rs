use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommonError {
    #[error("Parameter initialisation failed: {0}")]
    Init(String),

    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
}

pub type Result<T> = std::result::Result<T, CommonError>;
