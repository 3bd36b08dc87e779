//! The fusion training loop.

use candle_core::{DType, Module, Tensor};
use candle_nn::{Optimizer, VarBuilder, VarMap};
use chrono::{DateTime, Local};
use molfuse_common::{seed_parameters, ExecutionContext};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::artifacts::{run_timestamp, RunArtifacts};
use crate::checkpoint::BestCheckpoint;
use crate::config::{RunPaths, TrainingConfig};
use crate::embeddings::{EmbeddingLoader, EmbeddingSplits};
use crate::history::LossHistory;
use crate::loader::DataLoader;
use crate::mlp::FusionMlp;
use crate::optim::{Adam, ParamsAdam};
use crate::{FusionError, Result};

/// Result of [`train_fusion`].
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub history: LossHistory,
    pub best: BestCheckpoint,
    /// Loss of the best checkpoint on the test split, `None` if it is empty.
    pub test_loss: Option<f64>,
    pub input_dim: usize,
    /// Local time at which the last epoch completed; names the artifacts.
    pub finished_at: DateTime<Local>,
}

/// Train a fresh fusion MLP on `splits`.
///
/// Parameters and the per-epoch shuffle are both seeded from `ctx`, so
/// repeated runs on the CPU produce identical loss sequences.
pub fn train_fusion(
    splits: &EmbeddingSplits,
    config: &TrainingConfig,
    ctx: &ExecutionContext,
) -> Result<TrainingOutcome> {
    config.validate()?;
    if splits.train.is_empty() {
        return Err(FusionError::EmptySplit("train"));
    }
    if splits.val.is_empty() {
        return Err(FusionError::EmptySplit("val"));
    }

    let device = ctx.device();
    let input_dim = splits.input_dim();
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
    let model = FusionMlp::new(input_dim, &config.hidden_dims, vb)?;
    seed_parameters(&varmap, ctx.seed())?;
    info!(
        "Fusion MLP: input {} hidden {:?}, {} parameters",
        input_dim,
        config.hidden_dims,
        model.parameter_count()
    );

    let mut optimizer = Adam::new(
        varmap.all_vars(),
        ParamsAdam {
            lr: config.learning_rate,
            weight_decay: config.weight_decay,
            ..Default::default()
        },
    )?;

    let mut rng = StdRng::seed_from_u64(ctx.seed());
    let train_loader = DataLoader::new(config.batch_size, true);
    let eval_loader = DataLoader::new(config.batch_size, false);
    let val_batches = eval_loader.batches(&splits.val, &mut rng, device)?;
    debug!(
        "{} train batches, {} val batches per epoch",
        train_loader.num_batches(splits.train.len()),
        val_batches.len()
    );

    let mut history = LossHistory::new();
    let mut best = BestCheckpoint::empty();

    for epoch in 0..config.epochs {
        let batches = train_loader.batches(&splits.train, &mut rng, device)?;
        let mut total = 0.0;
        for (x, y) in &batches {
            let loss = batch_loss(&model, x, y)?;
            optimizer.backward_step(&loss)?;
            total += loss.to_scalar::<f32>()? as f64;
        }
        let train_loss = total / batches.len() as f64;
        let val_loss = evaluate(&model, &val_batches)?;

        history.push(train_loss, val_loss);
        best = best.consider(epoch, val_loss, &varmap)?;

        info!(
            "Epoch {}, Train Loss: {:.4}, Val Loss: {:.4}",
            epoch + 1,
            train_loss,
            val_loss
        );
    }
    let finished_at = Local::now();

    let test_loss = evaluate_checkpoint(&best, splits, config, ctx)?;
    if let Some(loss) = test_loss {
        info!(
            "Best epoch {}: val loss {:.4}, test loss {:.4}",
            best.epoch().map_or(0, |e| e + 1),
            best.val_loss(),
            loss
        );
    }

    Ok(TrainingOutcome {
        history,
        best,
        test_loss,
        input_dim,
        finished_at,
    })
}

fn batch_loss(model: &FusionMlp, x: &Tensor, y: &Tensor) -> Result<Tensor> {
    let pred = model.forward(x)?.squeeze(1)?;
    Ok(candle_nn::loss::mse(&pred, y)?)
}

/// Mean of per-batch losses, no parameter updates.
fn evaluate(model: &FusionMlp, batches: &[(Tensor, Tensor)]) -> Result<f64> {
    let mut total = 0.0;
    for (x, y) in batches {
        total += batch_loss(model, x, y)?.to_scalar::<f32>()? as f64;
    }
    Ok(total / batches.len().max(1) as f64)
}

/// Restore `best` into a fresh model and score the test split.
fn evaluate_checkpoint(
    best: &BestCheckpoint,
    splits: &EmbeddingSplits,
    config: &TrainingConfig,
    ctx: &ExecutionContext,
) -> Result<Option<f64>> {
    if splits.test.is_empty() || best.is_empty() {
        return Ok(None);
    }
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, ctx.device());
    let model = FusionMlp::new(splits.input_dim(), &config.hidden_dims, vb)?;
    best.restore_into(&varmap)?;

    let mut rng = StdRng::seed_from_u64(ctx.seed());
    let batches = DataLoader::new(config.batch_size, false).batches(&splits.test, &mut rng, ctx.device())?;
    Ok(Some(evaluate(&model, &batches)?))
}

/// A finished run: training outcome plus the files it wrote.
#[derive(Debug, Clone)]
pub struct FusionRun {
    pub outcome: TrainingOutcome,
    pub artifacts: RunArtifacts,
}

/// Load embeddings, train, and persist the best checkpoint and loss table.
pub fn run_fusion(
    loader: &dyn EmbeddingLoader,
    graph_source: &str,
    lm_source: &str,
    config: &TrainingConfig,
    paths: &RunPaths,
    ctx: &ExecutionContext,
) -> Result<FusionRun> {
    config.validate()?;
    let splits = loader.load(graph_source, lm_source)?;
    let outcome = train_fusion(&splits, config, ctx)?;
    let timestamp = run_timestamp(&outcome.finished_at);
    let artifacts = RunArtifacts::write(
        &paths.checkpoint_dir,
        &paths.loss_dir,
        &timestamp,
        &outcome.best,
        &outcome.history,
    )?;
    Ok(FusionRun { outcome, artifacts })
}
