//! Molfuse fusion trainer
//!
//! Trains a small MLP regressor on the concatenation of precomputed graph
//! embeddings and language-model embeddings, keeping the parameters of the
//! epoch with the lowest validation loss.
//!
//! # Features
//! - Safetensors embedding sources with train/validation/test splits
//! - Seeded shuffling and parameter initialisation for reproducible CPU runs
//! - Adam with L2 weight decay
//! - Best checkpoint as safetensors, per-epoch losses as CSV
//!
//! # Example
//! ```rust,no_run
//! use molfuse_common::ExecutionContext;
//! use molfuse_fusion::{run_fusion, RunPaths, SafetensorsEmbeddingLoader, TrainingConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let paths = RunPaths::default();
//!     let loader = SafetensorsEmbeddingLoader::new(&paths.embed_dir);
//!     let run = run_fusion(
//!         &loader,
//!         "GNN_embeddings",
//!         "LLM_embeddings",
//!         &TrainingConfig::default(),
//!         &paths,
//!         &ExecutionContext::cpu(42),
//!     )?;
//!     println!("best checkpoint: {}", run.artifacts.checkpoint.display());
//!     Ok(())
//! }
//! ```

pub mod artifacts;
pub mod checkpoint;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod history;
pub mod loader;
pub mod mlp;
pub mod optim;
pub mod trainer;

pub use artifacts::{artifact_stem, run_timestamp, RunArtifacts};
pub use checkpoint::BestCheckpoint;
pub use config::{RunPaths, TrainingConfig};
pub use embeddings::{EmbeddingLoader, EmbeddingSplits, SafetensorsEmbeddingLoader, Split};
pub use error::{FusionError, Result};
pub use history::LossHistory;
pub use loader::DataLoader;
pub use mlp::FusionMlp;
pub use optim::{Adam, ParamsAdam};
pub use trainer::{run_fusion, train_fusion, FusionRun, TrainingOutcome};
