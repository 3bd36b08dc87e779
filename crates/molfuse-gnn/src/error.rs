//! Error types for the graph models.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GnnError>;

#[derive(Error, Debug)]
pub enum GnnError {
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error("Edge type {edge_type} out of range for {num_relations} relations")]
    RelationOutOfRange { edge_type: u32, num_relations: usize },

    #[error("Relational model requires edge types but the batch has none")]
    MissingEdgeTypes,

    #[error("Invalid model configuration: {0}")]
    Config(String),

    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
