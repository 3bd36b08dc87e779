use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "molfuse - graph neural network regressors and graph/language-model embedding fusion"
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the fusion MLP on precomputed graph and language-model embeddings.
    TrainFusion(TrainFusionArgs),
    /// Build a GCN or RGCN model and report its layer widths and parameter count.
    DescribeModel(DescribeModelArgs),
}

/// Arguments for the `train-fusion` subcommand.
#[derive(Args, Debug)]
pub struct TrainFusionArgs {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "MOLFUSE_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the graph embedding source id.
    #[arg(long, value_name = "ID")]
    pub graph_embeddings: Option<String>,

    /// Override the language-model embedding source id.
    #[arg(long, value_name = "ID")]
    pub lm_embeddings: Option<String>,

    /// Override the number of training epochs.
    #[arg(long, value_name = "INT")]
    pub epochs: Option<usize>,

    /// Override the seed used for initialisation and shuffling.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Run on the CPU even if an accelerator is available.
    #[arg(long)]
    pub cpu: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Gcn,
    Rgcn,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolingArg {
    Mean,
    Sum,
}

/// Arguments for the `describe-model` subcommand.
#[derive(Args, Debug)]
pub struct DescribeModelArgs {
    /// Architecture to build.
    #[arg(long, value_enum, default_value_t = ModelKind::Gcn)]
    pub kind: ModelKind,

    /// Width of the per-atom feature vectors.
    #[arg(long, value_name = "INT")]
    pub input_dim: Option<usize>,

    /// Number of bond types (RGCN only).
    #[arg(long, value_name = "INT", default_value_t = 4)]
    pub num_relations: usize,

    /// Graph readout.
    #[arg(long, value_enum, default_value_t = PoolingArg::Mean)]
    pub pooling: PoolingArg,

    /// Read the full model configuration from a JSON file instead.
    #[arg(long, value_name = "PATH", conflicts_with_all = ["input_dim", "kind"])]
    pub model_config: Option<PathBuf>,
}
