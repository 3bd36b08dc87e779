//! Graph-level readout: reduce node representations to one vector per graph.

use candle_core::{DType, Tensor};
use serde::{Deserialize, Serialize};

/// Readout strategy for turning node embeddings into graph embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GraphPooling {
    /// Mean over the nodes of each graph
    #[default]
    Mean,

    /// Sum over the nodes of each graph
    Sum,
}

impl GraphPooling {
    /// Apply pooling to node embeddings.
    ///
    /// # Arguments
    /// * `x` - Tensor of shape (num_nodes, hidden_dim)
    /// * `batch` - u32 tensor of shape (num_nodes,) with each node's graph id
    /// * `num_graphs` - number of graphs in the batch
    ///
    /// # Returns
    /// Tensor of shape (num_graphs, hidden_dim)
    pub fn apply(&self, x: &Tensor, batch: &Tensor, num_graphs: usize) -> candle_core::Result<Tensor> {
        match self {
            GraphPooling::Mean => global_mean_pool(x, batch, num_graphs),
            GraphPooling::Sum => global_add_pool(x, batch, num_graphs),
        }
    }
}

/// Sum node embeddings per graph.
pub fn global_add_pool(x: &Tensor, batch: &Tensor, num_graphs: usize) -> candle_core::Result<Tensor> {
    let hidden = x.dim(1)?;
    Tensor::zeros((num_graphs, hidden), x.dtype(), x.device())?.index_add(batch, x, 0)
}

/// Average node embeddings per graph.
///
/// Graphs without nodes would divide by zero; the node count is clamped to
/// one so they pool to zeros instead.
pub fn global_mean_pool(x: &Tensor, batch: &Tensor, num_graphs: usize) -> candle_core::Result<Tensor> {
    let sums = global_add_pool(x, batch, num_graphs)?;

    let ones = Tensor::ones((x.dim(0)?, 1), DType::F32, x.device())?;
    let counts = Tensor::zeros((num_graphs, 1), DType::F32, x.device())?
        .index_add(batch, &ones, 0)?
        .clamp(1f32, f32::MAX)?
        .to_dtype(x.dtype())?;

    sums.broadcast_div(&counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_mean_pool() {
        let device = Device::Cpu;

        // 5 nodes, 2-dim features; graph 0 owns nodes 0..3, graph 1 owns 3..5
        let x = Tensor::from_vec(
            vec![
                1.0f32, 2.0, //
                2.0, 3.0, //
                3.0, 4.0, //
                10.0, 0.0, //
                20.0, 2.0,
            ],
            (5, 2),
            &device,
        )
        .unwrap();
        let batch = Tensor::new(&[0u32, 0, 0, 1, 1], &device).unwrap();

        let pooled = global_mean_pool(&x, &batch, 2).unwrap();
        let result = pooled.to_vec2::<f32>().unwrap();

        assert!((result[0][0] - 2.0).abs() < 1e-5);
        assert!((result[0][1] - 3.0).abs() < 1e-5);
        assert!((result[1][0] - 15.0).abs() < 1e-5);
        assert!((result[1][1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_add_pool() {
        let device = Device::Cpu;
        let x = Tensor::from_vec(vec![1.0f32, 2.0, 3.0], (3, 1), &device).unwrap();
        let batch = Tensor::new(&[0u32, 1, 1], &device).unwrap();

        let pooled = GraphPooling::Sum.apply(&x, &batch, 2).unwrap();
        assert_eq!(pooled.to_vec2::<f32>().unwrap(), vec![vec![1.0], vec![5.0]]);
    }

    #[test]
    fn test_mean_pool_single_node_graph_is_identity() {
        let device = Device::Cpu;
        let x = Tensor::from_vec(vec![0.5f32, -1.5], (1, 2), &device).unwrap();
        let batch = Tensor::new(&[0u32], &device).unwrap();

        let pooled = GraphPooling::Mean.apply(&x, &batch, 1).unwrap();
        assert_eq!(pooled.to_vec2::<f32>().unwrap(), vec![vec![0.5, -1.5]]);
    }
}
