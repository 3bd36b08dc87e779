//! Precomputed embedding sources and the train/validation/test splits built
//! from them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use tracing::{debug, info};

use crate::{FusionError, Result};

/// Inputs and scalar targets of one split.
#[derive(Debug, Clone)]
pub struct Split {
    /// `(n, input_dim)`
    x: Tensor,
    /// `(n,)`
    y: Tensor,
}

impl Split {
    /// Pair inputs with targets. Targets may be `(n,)` or `(n, 1)`.
    pub fn new(x: Tensor, y: Tensor) -> Result<Self> {
        let (rows, _) = x
            .dims2()
            .map_err(|_| FusionError::Embeddings(format!("inputs must be rank 2, got {:?}", x.dims())))?;
        let y = y.flatten_all()?;
        if y.dim(0)? != rows {
            return Err(FusionError::Embeddings(format!(
                "{} inputs but {} targets",
                rows,
                y.dim(0)?
            )));
        }
        Ok(Self {
            x: x.to_dtype(DType::F32)?,
            y: y.to_dtype(DType::F32)?,
        })
    }

    pub fn x(&self) -> &Tensor {
        &self.x
    }

    pub fn y(&self) -> &Tensor {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.dim(0).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn input_dim(&self) -> usize {
        self.x.dim(1).unwrap_or(0)
    }
}

/// The three disjoint splits of a fusion dataset.
#[derive(Debug, Clone)]
pub struct EmbeddingSplits {
    pub train: Split,
    pub val: Split,
    pub test: Split,
}

impl EmbeddingSplits {
    /// Combined input width shared by all splits.
    pub fn input_dim(&self) -> usize {
        self.train.input_dim()
    }

    /// Concatenate graph and language-model inputs per split, `[graph | lm]`.
    ///
    /// Targets are taken from the graph source; the language-model source
    /// must agree on every split's row count.
    pub fn fuse(graph: &HashMap<String, Tensor>, lm: &HashMap<String, Tensor>) -> Result<Self> {
        let split = |name: &'static str| -> Result<Split> {
            let gx = tensor(graph, &format!("{name}_x"), "graph")?;
            let lx = tensor(lm, &format!("{name}_x"), "language-model")?;
            let y = tensor(graph, &format!("{name}_y"), "graph")?;

            let (g_rows, l_rows) = (gx.dim(0)?, lx.dim(0)?);
            if g_rows != l_rows {
                return Err(FusionError::Embeddings(format!(
                    "{name}: graph source has {g_rows} rows, language-model source has {l_rows}"
                )));
            }
            let x = Tensor::cat(&[&gx.to_dtype(DType::F32)?, &lx.to_dtype(DType::F32)?], 1)?;
            Split::new(x, y.clone())
        };

        let splits = Self {
            train: split("train")?,
            val: split("val")?,
            test: split("test")?,
        };
        let dim = splits.input_dim();
        if splits.val.input_dim() != dim || splits.test.input_dim() != dim {
            return Err(FusionError::Embeddings(format!(
                "input widths differ across splits: train {}, val {}, test {}",
                dim,
                splits.val.input_dim(),
                splits.test.input_dim()
            )));
        }
        Ok(splits)
    }
}

fn tensor<'a>(source: &'a HashMap<String, Tensor>, name: &str, kind: &str) -> Result<&'a Tensor> {
    source
        .get(name)
        .ok_or_else(|| FusionError::Embeddings(format!("{kind} source is missing '{name}'")))
}

/// Something that can produce fused splits from two named embedding sources.
pub trait EmbeddingLoader {
    fn load(&self, graph_source: &str, lm_source: &str) -> Result<EmbeddingSplits>;
}

/// Loads `<dir>/<source>.safetensors` files holding the six split tensors.
#[derive(Debug, Clone)]
pub struct SafetensorsEmbeddingLoader {
    dir: PathBuf,
}

impl SafetensorsEmbeddingLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, source: &str) -> PathBuf {
        self.dir.join(format!("{source}.safetensors"))
    }

    fn read(&self, source: &str) -> Result<HashMap<String, Tensor>> {
        let path = self.path_for(source);
        if !Path::new(&path).exists() {
            return Err(FusionError::Embeddings(format!(
                "embedding source not found: {}",
                path.display()
            )));
        }
        let tensors = candle_core::safetensors::load(&path, &Device::Cpu)?;
        debug!("Read {} tensors from {}", tensors.len(), path.display());
        Ok(tensors)
    }
}

impl EmbeddingLoader for SafetensorsEmbeddingLoader {
    fn load(&self, graph_source: &str, lm_source: &str) -> Result<EmbeddingSplits> {
        info!("Loading embeddings: graph={} lm={}", graph_source, lm_source);
        let graph = self.read(graph_source)?;
        let lm = self.read(lm_source)?;
        let splits = EmbeddingSplits::fuse(&graph, &lm)?;
        info!(
            "Loaded {} train / {} val / {} test examples, input dim {}",
            splits.train.len(),
            splits.val.len(),
            splits.test.len(),
            splits.input_dim()
        );
        Ok(splits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(rows: [usize; 3], dim: usize) -> HashMap<String, Tensor> {
        let mut map = HashMap::new();
        for (name, n) in ["train", "val", "test"].into_iter().zip(rows) {
            let x: Vec<f32> = (0..n * dim).map(|v| v as f32).collect();
            let y: Vec<f32> = (0..n).map(|v| v as f32 * 10.0).collect();
            map.insert(format!("{name}_x"), Tensor::from_vec(x, (n, dim), &Device::Cpu).unwrap());
            map.insert(format!("{name}_y"), Tensor::from_vec(y, (n, 1), &Device::Cpu).unwrap());
        }
        map
    }

    #[test]
    fn test_fuse_concatenates_graph_then_lm() {
        let graph = source([2, 1, 1], 2);
        let lm = source([2, 1, 1], 3);
        let splits = EmbeddingSplits::fuse(&graph, &lm).unwrap();

        assert_eq!(splits.input_dim(), 5);
        let rows = splits.train.x().to_vec2::<f32>().unwrap();
        assert_eq!(rows[1], vec![2.0, 3.0, 3.0, 4.0, 5.0]);
        assert_eq!(splits.train.y().to_vec1::<f32>().unwrap(), vec![0.0, 10.0]);
    }

    #[test]
    fn test_fuse_rejects_row_mismatch() {
        let graph = source([2, 1, 1], 2);
        let lm = source([3, 1, 1], 2);
        assert!(matches!(
            EmbeddingSplits::fuse(&graph, &lm),
            Err(FusionError::Embeddings(_))
        ));
    }

    #[test]
    fn test_fuse_reports_missing_tensor() {
        let mut graph = source([2, 1, 1], 2);
        graph.remove("val_y");
        let lm = source([2, 1, 1], 2);
        let err = EmbeddingSplits::fuse(&graph, &lm).unwrap_err();
        assert!(err.to_string().contains("val_y"));
    }

    #[test]
    fn test_split_rejects_target_count_mismatch() {
        let x = Tensor::zeros((3, 2), DType::F32, &Device::Cpu).unwrap();
        let y = Tensor::zeros(2, DType::F32, &Device::Cpu).unwrap();
        assert!(Split::new(x, y).is_err());
    }

    #[test]
    fn test_loader_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = SafetensorsEmbeddingLoader::new(dir.path());
        assert!(matches!(loader.load("gnn", "llm"), Err(FusionError::Embeddings(_))));
    }
}
