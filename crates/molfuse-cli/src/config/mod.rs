//! Configuration loading for molfuse.
//! Reads molfuse.toml from the current directory or path in MOLFUSE_CONFIG env var.

use molfuse_common::DevicePreference;
use molfuse_fusion::{RunPaths, TrainingConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: RunPaths,
    #[serde(default)]
    pub embeddings: EmbeddingSources,
    #[serde(default)]
    pub training: TrainingSection,
    #[serde(default)]
    pub device: DeviceConfig,
}

/// Ids of the two embedding sources under `paths.embed_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSources {
    #[serde(default = "default_graph_source")]
    pub graph_source: String,
    #[serde(default = "default_lm_source")]
    pub lm_source: String,
}

fn default_graph_source() -> String { "GNN_embeddings_20241210-043903".to_string() }
fn default_lm_source()    -> String { "LLM_embeddings_20241210-035121".to_string() }

impl Default for EmbeddingSources {
    fn default() -> Self {
        Self {
            graph_source: default_graph_source(),
            lm_source: default_lm_source(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSection {
    #[serde(flatten)]
    pub params: TrainingConfig,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 { 42 }

impl Default for TrainingSection {
    fn default() -> Self {
        Self {
            params: TrainingConfig::default(),
            seed: default_seed(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub prefer: DevicePreference,
}

mod tests;

impl Config {
    /// Load configuration from molfuse.toml.
    /// Checks MOLFUSE_CONFIG env var first, then current directory.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("MOLFUSE_CONFIG")
            .unwrap_or_else(|_| "molfuse.toml".to_string());
        Self::load_from(Path::new(&path))
    }

    /// Parse `path`, or fall back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::warn!(
                "Config file not found: {} (using defaults; copy molfuse.example.toml to molfuse.toml to customise)",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.training.params.validate()?;
        Ok(config)
    }
}
