//! Molfuse graph models
//!
//! GCN and RGCN regression models for molecular property prediction,
//! in pure Rust on Candle.
//!
//! # Features
//! - One configurable `GraphRegressionModel` covering both the plain (GCN)
//!   and relational (RGCN) architectures
//! - Global mean or sum readout over each graph in a mini-batch
//! - Pooled graph embeddings for downstream fusion models
//! - Explicit rejection of edge types outside the configured relation count
//!
//! # Example
//! ```rust
//! use candle_core::DType;
//! use candle_nn::{VarBuilder, VarMap};
//! use molfuse_common::ExecutionContext;
//! use molfuse_gnn::{GraphBatch, GraphModelConfig, GraphRegressionModel, MolecularGraph};
//!
//! fn main() -> anyhow::Result<()> {
//!     let ctx = ExecutionContext::cpu(0);
//!     let varmap = VarMap::new();
//!     let vb = VarBuilder::from_varmap(&varmap, DType::F32, ctx.device());
//!     let model = GraphRegressionModel::new(GraphModelConfig::gcn(2), vb)?;
//!
//!     let water = MolecularGraph::new(
//!         vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 1.0]],
//!         vec![(0, 1), (0, 2)],
//!     )?
//!     .with_reverse_edges();
//!     let batch = GraphBatch::collate(&[water], ctx.device())?;
//!
//!     let prediction = model.forward(&batch)?;
//!     assert_eq!(prediction.dims(), &[1, 1]);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod conv;
pub mod error;
pub mod graph;
pub mod model;
pub mod pooling;

pub use batch::GraphLoader;
pub use config::{GraphConvKind, GraphModelConfig};
pub use error::{GnnError, Result};
pub use graph::{GraphBatch, MolecularGraph};
pub use model::GraphRegressionModel;
pub use pooling::GraphPooling;
