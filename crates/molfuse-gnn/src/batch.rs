//! Mini-batching of graph datasets.

use candle_core::Device;

use crate::{GraphBatch, MolecularGraph, Result};

/// Iterates a slice of graphs in fixed order, collating `batch_size` graphs
/// at a time. The last batch may be short.
pub struct GraphLoader<'a> {
    chunks: std::slice::Chunks<'a, MolecularGraph>,
    device: Device,
}

impl<'a> GraphLoader<'a> {
    /// Create a loader. A `batch_size` of zero is treated as one.
    pub fn new(graphs: &'a [MolecularGraph], batch_size: usize, device: &Device) -> Self {
        Self {
            chunks: graphs.chunks(batch_size.max(1)),
            device: device.clone(),
        }
    }

    /// Number of batches the loader will yield in total.
    pub fn num_batches(&self) -> usize {
        self.chunks.len()
    }
}

impl Iterator for GraphLoader<'_> {
    type Item = Result<GraphBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.chunks
            .next()
            .map(|chunk| GraphBatch::collate(chunk, &self.device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(value: f32) -> MolecularGraph {
        MolecularGraph::new(vec![vec![value]], vec![]).unwrap()
    }

    #[test]
    fn test_graph_loader() {
        let graphs: Vec<_> = (0..7).map(|i| single(i as f32)).collect();
        let loader = GraphLoader::new(&graphs, 3, &Device::Cpu);
        assert_eq!(loader.num_batches(), 3);

        let sizes: Vec<usize> = loader.map(|b| b.unwrap().num_graphs()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn test_graph_loader_keeps_order() {
        let graphs: Vec<_> = (0..4).map(|i| single(i as f32)).collect();
        let first = GraphLoader::new(&graphs, 2, &Device::Cpu).next().unwrap().unwrap();
        assert_eq!(first.x().to_vec2::<f32>().unwrap(), vec![vec![0.0], vec![1.0]]);
    }
}
