//! molfuse: molecular property regression from graph and language-model embeddings
//! Entry point for the command-line binary.

mod cli;
mod config;

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use clap::Parser;
use molfuse_common::{DevicePreference, ExecutionContext};
use molfuse_fusion::{run_fusion, SafetensorsEmbeddingLoader};
use molfuse_gnn::{GraphConvKind, GraphModelConfig, GraphPooling, GraphRegressionModel};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, DescribeModelArgs, ModelKind, PoolingArg, TrainFusionArgs};

fn main() -> anyhow::Result<()> {
    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("molfuse=debug,info")),
        )
        .init();

    let cli = Cli::parse();
    info!("molfuse {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::TrainFusion(args) => train_fusion(args),
        Commands::DescribeModel(args) => describe_model(args),
    }
}

fn train_fusion(args: TrainFusionArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => config::Config::load_from(path)?,
        None => config::Config::load()?,
    };

    if let Some(id) = args.graph_embeddings {
        config.embeddings.graph_source = id;
    }
    if let Some(id) = args.lm_embeddings {
        config.embeddings.lm_source = id;
    }
    if let Some(epochs) = args.epochs {
        config.training.params = config.training.params.with_epochs(epochs);
    }
    if let Some(seed) = args.seed {
        config.training.seed = seed;
    }
    if args.cpu {
        config.device.prefer = DevicePreference::Cpu;
    }

    info!(
        "Configuration loaded. Embeddings: graph={} lm={}, epochs: {}, seed: {}",
        config.embeddings.graph_source,
        config.embeddings.lm_source,
        config.training.params.epochs,
        config.training.seed
    );

    let ctx = ExecutionContext::new(config.device.prefer, config.training.seed);
    let loader = SafetensorsEmbeddingLoader::new(&config.paths.embed_dir);
    let run = run_fusion(
        &loader,
        &config.embeddings.graph_source,
        &config.embeddings.lm_source,
        &config.training.params,
        &config.paths,
        &ctx,
    )?;

    let best = &run.outcome.best;
    info!(
        "Training finished. Best epoch: {}, val loss: {:.4}",
        best.epoch().map_or(0, |e| e + 1),
        best.val_loss()
    );
    match run.outcome.test_loss {
        Some(loss) => info!("Test loss of best checkpoint: {:.4}", loss),
        None => info!("Test split is empty; no test loss reported"),
    }
    info!("Checkpoint: {}", run.artifacts.checkpoint.display());
    info!("Losses:     {}", run.artifacts.losses.display());
    Ok(())
}

fn describe_model(args: DescribeModelArgs) -> anyhow::Result<()> {
    let config = match &args.model_config {
        Some(path) => GraphModelConfig::from_json_file(path)?,
        None => {
            let input_dim = args
                .input_dim
                .ok_or_else(|| anyhow::anyhow!("--input-dim is required unless --model-config is given"))?;
            let pooling = match args.pooling {
                PoolingArg::Mean => GraphPooling::Mean,
                PoolingArg::Sum => GraphPooling::Sum,
            };
            let base = match args.kind {
                ModelKind::Gcn => GraphModelConfig::gcn(input_dim),
                ModelKind::Rgcn => GraphModelConfig::rgcn(input_dim, args.num_relations),
            };
            base.with_pooling(pooling)
        }
    };

    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    let model = GraphRegressionModel::new(config, vb)?;
    let config = model.config();

    let kind = match config.kind {
        GraphConvKind::Plain => "GCN".to_string(),
        GraphConvKind::Relational { num_relations } => format!("RGCN ({num_relations} relations)"),
    };
    info!("Model: {}, pooling: {:?}", kind, config.pooling);

    let mut widths = vec![config.input_dim];
    widths.extend(&config.hidden_dims);
    for (i, pair) in widths.windows(2).enumerate() {
        info!("  conv{}: {} -> {}", i, pair[0], pair[1]);
    }
    info!("  fc: {} -> 1", config.embedding_dim());
    info!("Parameters: {}", model.parameter_count());
    Ok(())
}
