//! Fusion MLP regressor over concatenated embeddings.

use candle_core::{Module, Tensor};
use candle_nn::{linear, Linear, VarBuilder};

use crate::{FusionError, Result};

/// Fully connected regressor `input -> hidden... -> 1` with ReLU between
/// layers. Layers are stored as `fc0`, `fc1`, ... in the var builder.
#[derive(Debug, Clone)]
pub struct FusionMlp {
    layers: Vec<Linear>,
    input_dim: usize,
}

impl FusionMlp {
    pub fn new(input_dim: usize, hidden_dims: &[usize], vb: VarBuilder) -> Result<Self> {
        if input_dim == 0 {
            return Err(FusionError::Config("input width must be positive".to_string()));
        }
        let mut widths = Vec::with_capacity(hidden_dims.len() + 2);
        widths.push(input_dim);
        widths.extend_from_slice(hidden_dims);
        widths.push(1);

        let layers = widths
            .windows(2)
            .enumerate()
            .map(|(i, w)| linear(w[0], w[1], vb.pp(format!("fc{i}"))))
            .collect::<candle_core::Result<Vec<_>>>()?;

        Ok(Self { layers, input_dim })
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Trainable scalars across all layers.
    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| {
                l.weight().elem_count() + l.bias().map(|b| b.elem_count()).unwrap_or(0)
            })
            .sum()
    }
}

impl Module for FusionMlp {
    /// `(batch, input_dim) -> (batch, 1)`
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let last = self.layers.len() - 1;
        let mut h = xs.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            h = layer.forward(&h)?;
            if i < last {
                h = h.relu()?;
            }
        }
        Ok(h)
    }
}
