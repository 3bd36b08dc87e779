//! Configuration for the graph regression models.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{GnnError, GraphPooling, Result};

/// Which convolution every stage of the model uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GraphConvKind {
    /// Graph convolution with symmetric degree normalisation (GCN)
    Plain,

    /// Relational graph convolution with one weight per edge type (RGCN)
    Relational { num_relations: usize },
}

/// Configuration for a graph regression model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphModelConfig {
    /// Convolution kind shared by all stages
    pub kind: GraphConvKind,

    /// Node feature dimension
    pub input_dim: usize,

    /// Output width of each convolution stage, in order
    pub hidden_dims: Vec<usize>,

    /// Readout applied after the last stage (default: mean)
    #[serde(default)]
    pub pooling: GraphPooling,
}

impl GraphModelConfig {
    /// Four GCN stages, 128 -> 64 -> 64 -> 32.
    pub fn gcn(input_dim: usize) -> Self {
        Self {
            kind: GraphConvKind::Plain,
            input_dim,
            hidden_dims: vec![128, 64, 64, 32],
            pooling: GraphPooling::Mean,
        }
    }

    /// Three RGCN stages, 256 -> 256 -> 32.
    pub fn rgcn(input_dim: usize, num_relations: usize) -> Self {
        Self {
            kind: GraphConvKind::Relational { num_relations },
            input_dim,
            hidden_dims: vec![256, 256, 32],
            pooling: GraphPooling::Mean,
        }
    }

    /// Replace the stage widths.
    pub fn with_hidden_dims(mut self, dims: Vec<usize>) -> Self {
        self.hidden_dims = dims;
        self
    }

    /// Set the readout.
    pub fn with_pooling(mut self, pooling: GraphPooling) -> Self {
        self.pooling = pooling;
        self
    }

    /// Width of the pooled graph embedding.
    pub fn embedding_dim(&self) -> usize {
        self.hidden_dims.last().copied().unwrap_or(self.input_dim)
    }

    /// Load a config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GnnError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 {
            return Err(GnnError::Config("input_dim must be positive".to_string()));
        }
        if self.hidden_dims.is_empty() {
            return Err(GnnError::Config("at least one convolution stage is required".to_string()));
        }
        if self.hidden_dims.contains(&0) {
            return Err(GnnError::Config("stage widths must be positive".to_string()));
        }
        if let GraphConvKind::Relational { num_relations: 0 } = self.kind {
            return Err(GnnError::Config("num_relations must be positive".to_string()));
        }
        Ok(())
    }
}
