//! Graph samples and collated mini-batches.

use candle_core::{DType, Device, Tensor};

use crate::{GnnError, Result};

/// One molecule as a graph: atom features, bond connectivity and optional
/// bond types.
#[derive(Debug, Clone, PartialEq)]
pub struct MolecularGraph {
    /// Row-major node features, `num_nodes * feature_dim` values
    node_features: Vec<f32>,
    feature_dim: usize,
    /// Directed edges as `(source, target)` node indices
    edges: Vec<(u32, u32)>,
    /// One relation label per edge, when present
    edge_types: Option<Vec<u32>>,
}

impl MolecularGraph {
    /// Build a graph from per-node feature rows and directed edges.
    pub fn new(node_features: Vec<Vec<f32>>, edges: Vec<(usize, usize)>) -> Result<Self> {
        let num_nodes = node_features.len();
        if num_nodes == 0 {
            return Err(GnnError::InvalidGraph("graph has no nodes".to_string()));
        }
        let feature_dim = node_features[0].len();
        if feature_dim == 0 {
            return Err(GnnError::InvalidGraph("node features are empty".to_string()));
        }
        if let Some((i, row)) = node_features
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != feature_dim)
        {
            return Err(GnnError::InvalidGraph(format!(
                "node {} has {} features, expected {}",
                i,
                row.len(),
                feature_dim
            )));
        }

        let mut checked = Vec::with_capacity(edges.len());
        for (s, t) in edges {
            if s >= num_nodes || t >= num_nodes {
                return Err(GnnError::InvalidGraph(format!(
                    "edge ({}, {}) references a node outside 0..{}",
                    s, t, num_nodes
                )));
            }
            checked.push((s as u32, t as u32));
        }

        Ok(Self {
            node_features: node_features.into_iter().flatten().collect(),
            feature_dim,
            edges: checked,
            edge_types: None,
        })
    }

    /// Attach one relation label per edge.
    pub fn with_edge_types(mut self, edge_types: Vec<u32>) -> Result<Self> {
        if edge_types.len() != self.edges.len() {
            return Err(GnnError::InvalidGraph(format!(
                "{} edge types for {} edges",
                edge_types.len(),
                self.edges.len()
            )));
        }
        self.edge_types = Some(edge_types);
        Ok(self)
    }

    /// Add the reverse of every edge, keeping its type. Bonds are
    /// undirected, message passing is not.
    pub fn with_reverse_edges(mut self) -> Self {
        let reversed: Vec<(u32, u32)> = self.edges.iter().map(|&(s, t)| (t, s)).collect();
        self.edges.extend(reversed);
        if let Some(types) = self.edge_types.as_mut() {
            let copy = types.clone();
            types.extend(copy);
        }
        self
    }

    pub fn num_nodes(&self) -> usize {
        self.node_features.len() / self.feature_dim
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    pub fn edge_types(&self) -> Option<&[u32]> {
        self.edge_types.as_deref()
    }
}

/// A disjoint union of graphs ready for a forward pass.
///
/// Node features and the graph assignment live on the device; the
/// connectivity stays on the host, where the convolutions derive their
/// normalisation and per-relation edge lists once per forward pass.
#[derive(Debug, Clone)]
pub struct GraphBatch {
    x: Tensor,
    batch: Tensor,
    sources: Vec<u32>,
    targets: Vec<u32>,
    edge_types: Option<Vec<u32>>,
    num_graphs: usize,
}

impl GraphBatch {
    /// Collate graphs into one batch, offsetting node indices per graph.
    pub fn collate(graphs: &[MolecularGraph], device: &Device) -> Result<Self> {
        let first = graphs
            .first()
            .ok_or_else(|| GnnError::InvalidGraph("cannot collate an empty batch".to_string()))?;
        let feature_dim = first.feature_dim();
        let typed = first.edge_types().is_some();

        let mut features = Vec::new();
        let mut edges = Vec::new();
        let mut edge_types = typed.then(Vec::new);
        let mut assignment = Vec::new();
        let mut offset = 0u32;

        for (g, graph) in graphs.iter().enumerate() {
            if graph.feature_dim() != feature_dim {
                return Err(GnnError::InvalidGraph(format!(
                    "graph {} has feature dim {}, batch uses {}",
                    g,
                    graph.feature_dim(),
                    feature_dim
                )));
            }
            if graph.edge_types().is_some() != typed {
                return Err(GnnError::InvalidGraph(format!(
                    "graph {} disagrees with the batch on edge types",
                    g
                )));
            }

            features.extend_from_slice(&graph.node_features);
            edges.extend(graph.edges().iter().map(|&(s, t)| (s + offset, t + offset)));
            if let (Some(all), Some(types)) = (edge_types.as_mut(), graph.edge_types()) {
                all.extend_from_slice(types);
            }
            assignment.extend(std::iter::repeat_n(g as u32, graph.num_nodes()));
            offset += graph.num_nodes() as u32;
        }

        let x = Tensor::from_vec(features, (offset as usize, feature_dim), device)?;
        Self::from_parts(x, edges, edge_types, assignment)
    }

    /// Build a batch from already-collated parts, validating them.
    pub fn from_parts(
        x: Tensor,
        edges: Vec<(u32, u32)>,
        edge_types: Option<Vec<u32>>,
        assignment: Vec<u32>,
    ) -> Result<Self> {
        let (num_nodes, _) = x.dims2()?;
        if num_nodes == 0 {
            return Err(GnnError::InvalidGraph("batch has no nodes".to_string()));
        }
        if assignment.len() != num_nodes {
            return Err(GnnError::InvalidGraph(format!(
                "batch assignment has {} entries for {} nodes",
                assignment.len(),
                num_nodes
            )));
        }
        if assignment[0] != 0 || assignment.windows(2).any(|w| w[1] != w[0] && w[1] != w[0] + 1) {
            return Err(GnnError::InvalidGraph(
                "batch assignment must count graphs up from 0 without gaps".to_string(),
            ));
        }
        if let Some(&(s, t)) = edges
            .iter()
            .find(|&&(s, t)| s as usize >= num_nodes || t as usize >= num_nodes)
        {
            return Err(GnnError::InvalidGraph(format!(
                "edge ({}, {}) references a node outside 0..{}",
                s, t, num_nodes
            )));
        }
        if let Some(types) = &edge_types {
            if types.len() != edges.len() {
                return Err(GnnError::InvalidGraph(format!(
                    "{} edge types for {} edges",
                    types.len(),
                    edges.len()
                )));
            }
        }

        let device = x.device().clone();
        let x = x.to_dtype(DType::F32)?;
        let (sources, targets): (Vec<u32>, Vec<u32>) = edges.into_iter().unzip();
        let num_graphs = assignment[num_nodes - 1] as usize + 1;
        let batch = Tensor::new(assignment.as_slice(), &device)?;

        Ok(Self {
            x,
            batch,
            sources,
            targets,
            edge_types,
            num_graphs,
        })
    }

    /// Node features, `(num_nodes, feature_dim)`.
    pub fn x(&self) -> &Tensor {
        &self.x
    }

    /// Graph membership of each node, `(num_nodes,)`.
    pub fn batch(&self) -> &Tensor {
        &self.batch
    }

    pub fn sources(&self) -> &[u32] {
        &self.sources
    }

    pub fn targets(&self) -> &[u32] {
        &self.targets
    }

    pub fn edge_types(&self) -> Option<&[u32]> {
        self.edge_types.as_deref()
    }

    pub fn num_nodes(&self) -> usize {
        self.x.dim(0).unwrap_or(0)
    }

    pub fn feature_dim(&self) -> usize {
        self.x.dim(1).unwrap_or(0)
    }

    pub fn num_edges(&self) -> usize {
        self.sources.len()
    }

    pub fn num_graphs(&self) -> usize {
        self.num_graphs
    }

    pub fn device(&self) -> &Device {
        self.x.device()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(n: usize, dim: usize) -> MolecularGraph {
        let feats = (0..n).map(|i| vec![i as f32; dim]).collect();
        let edges = (1..n).map(|i| (i - 1, i)).collect();
        MolecularGraph::new(feats, edges).unwrap()
    }

    #[test]
    fn test_rejects_edge_outside_graph() {
        let err = MolecularGraph::new(vec![vec![1.0], vec![2.0]], vec![(0, 2)]).unwrap_err();
        assert!(matches!(err, GnnError::InvalidGraph(_)));
    }

    #[test]
    fn test_rejects_ragged_features() {
        let err = MolecularGraph::new(vec![vec![1.0, 2.0], vec![3.0]], vec![]).unwrap_err();
        assert!(matches!(err, GnnError::InvalidGraph(_)));
    }

    #[test]
    fn test_reverse_edges_duplicate_types() {
        let g = path(3, 2)
            .with_edge_types(vec![0, 1])
            .unwrap()
            .with_reverse_edges();
        assert_eq!(g.num_edges(), 4);
        assert_eq!(g.edges()[2], (1, 0));
        assert_eq!(g.edge_types().unwrap(), &[0, 1, 0, 1]);
    }

    #[test]
    fn test_collate_offsets_nodes() {
        let batch = GraphBatch::collate(&[path(3, 2), path(2, 2)], &Device::Cpu).unwrap();
        assert_eq!(batch.num_nodes(), 5);
        assert_eq!(batch.num_graphs(), 2);
        assert_eq!(batch.sources(), &[0, 1, 3]);
        assert_eq!(batch.targets(), &[1, 2, 4]);
        assert_eq!(batch.batch().to_vec1::<u32>().unwrap(), vec![0, 0, 0, 1, 1]);
        assert_eq!(batch.num_edges(), 3);
    }

    #[test]
    fn test_collate_rejects_mixed_edge_types() {
        let typed = path(2, 1).with_edge_types(vec![0]).unwrap();
        let err = GraphBatch::collate(&[typed, path(2, 1)], &Device::Cpu).unwrap_err();
        assert!(matches!(err, GnnError::InvalidGraph(_)));
    }

    #[test]
    fn test_from_parts_rejects_gapped_assignment() {
        let x = Tensor::zeros((3, 2), DType::F32, &Device::Cpu).unwrap();
        let err = GraphBatch::from_parts(x, vec![], None, vec![0, 0, 2]).unwrap_err();
        assert!(matches!(err, GnnError::InvalidGraph(_)));
    }
}
