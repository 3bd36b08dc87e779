//! Shared fixtures for molfuse tests: synthetic molecules and on-disk
//! embedding sources.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};
use molfuse_gnn::MolecularGraph;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

pub use pretty_assertions;

/// A ring of `n_atoms` atoms with bonds in both directions.
///
/// Atom `i` gets a one-hot feature at `i % feature_dim`; bond `i -> i+1`
/// gets relation `i % num_relations`.
pub fn ring_molecule(
    n_atoms: usize,
    feature_dim: usize,
    num_relations: usize,
) -> molfuse_gnn::Result<MolecularGraph> {
    let features = (0..n_atoms)
        .map(|i| {
            let mut row = vec![0.0f32; feature_dim];
            row[i % feature_dim] = 1.0;
            row
        })
        .collect();
    let edges = (0..n_atoms).map(|i| (i, (i + 1) % n_atoms)).collect();
    let types = (0..n_atoms).map(|i| (i % num_relations.max(1)) as u32).collect();

    Ok(MolecularGraph::new(features, edges)?
        .with_edge_types(types)?
        .with_reverse_edges())
}

/// Row counts of the three splits.
#[derive(Debug, Clone, Copy)]
pub struct SplitSizes {
    pub train: usize,
    pub val: usize,
    pub test: usize,
}

/// Synthetic paired embeddings with a learnable target.
///
/// Targets are `sum(graph) - 0.5 * sum(lm)` plus small noise, so an MLP
/// over the concatenated inputs can fit them.
#[derive(Debug, Clone)]
pub struct EmbeddingFixture {
    pub graph_dim: usize,
    pub lm_dim: usize,
    pub sizes: SplitSizes,
    pub seed: u64,
}

impl EmbeddingFixture {
    pub fn new(graph_dim: usize, lm_dim: usize, sizes: SplitSizes, seed: u64) -> Self {
        Self {
            graph_dim,
            lm_dim,
            sizes,
            seed,
        }
    }

    /// Build the tensors of both sources, keyed `train_x`, ..., `test_y`.
    pub fn tensors(&self) -> anyhow::Result<(HashMap<String, Tensor>, HashMap<String, Tensor>)> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let values = Uniform::new_inclusive(-1.0f32, 1.0);
        let noise = Uniform::new_inclusive(-0.01f32, 0.01);
        let device = Device::Cpu;

        let mut graph = HashMap::new();
        let mut lm = HashMap::new();
        for (split, n) in [
            ("train", self.sizes.train),
            ("val", self.sizes.val),
            ("test", self.sizes.test),
        ] {
            let gx: Vec<f32> = (0..n * self.graph_dim).map(|_| values.sample(&mut rng)).collect();
            let lx: Vec<f32> = (0..n * self.lm_dim).map(|_| values.sample(&mut rng)).collect();
            let y: Vec<f32> = (0..n)
                .map(|i| {
                    let g: f32 = gx[i * self.graph_dim..(i + 1) * self.graph_dim].iter().sum();
                    let l: f32 = lx[i * self.lm_dim..(i + 1) * self.lm_dim].iter().sum();
                    g - 0.5 * l + noise.sample(&mut rng)
                })
                .collect();

            graph.insert(
                format!("{split}_x"),
                Tensor::from_vec(gx, (n, self.graph_dim), &device)?,
            );
            lm.insert(
                format!("{split}_x"),
                Tensor::from_vec(lx, (n, self.lm_dim), &device)?,
            );
            let y = Tensor::from_vec(y, n, &device)?;
            lm.insert(format!("{split}_y"), y.clone());
            graph.insert(format!("{split}_y"), y);
        }
        Ok((graph, lm))
    }

    /// Write both sources as `<dir>/<id>.safetensors`.
    pub fn write(&self, dir: &Path, graph_id: &str, lm_id: &str) -> anyhow::Result<()> {
        let (graph, lm) = self.tensors()?;
        candle_core::safetensors::save(&graph, dir.join(format!("{graph_id}.safetensors")))?;
        candle_core::safetensors::save(&lm, dir.join(format!("{lm_id}.safetensors")))?;
        Ok(())
    }
}

/// Temporary workspace with `embeddings/`, `checkpoints/` and `losses/`
/// subdirectories. Removed on drop.
pub struct RunDirs {
    _root: TempDir,
    pub embed_dir: PathBuf,
    pub checkpoint_dir: PathBuf,
    pub loss_dir: PathBuf,
}

impl RunDirs {
    pub fn new() -> anyhow::Result<Self> {
        let root = tempfile::tempdir()?;
        let embed_dir = root.path().join("embeddings");
        let checkpoint_dir = root.path().join("checkpoints");
        let loss_dir = root.path().join("losses");
        for dir in [&embed_dir, &checkpoint_dir, &loss_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(Self {
            _root: root,
            embed_dir,
            checkpoint_dir,
            loss_dir,
        })
    }

    /// File names directly under `dir`, sorted.
    pub fn list(dir: &Path) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_molecule_shape() {
        let g = ring_molecule(5, 3, 2).unwrap();
        assert_eq!(g.num_nodes(), 5);
        assert_eq!(g.num_edges(), 10);
        assert!(g.edge_types().unwrap().iter().all(|&t| t < 2));
    }

    #[test]
    fn test_fixture_is_deterministic() {
        let sizes = SplitSizes {
            train: 4,
            val: 2,
            test: 1,
        };
        let (a, _) = EmbeddingFixture::new(3, 2, sizes, 9).tensors().unwrap();
        let (b, _) = EmbeddingFixture::new(3, 2, sizes, 9).tensors().unwrap();
        assert_eq!(
            a["train_y"].to_vec1::<f32>().unwrap(),
            b["train_y"].to_vec1::<f32>().unwrap()
        );
        assert_eq!(a["val_x"].dims(), &[2, 3]);
    }
}
