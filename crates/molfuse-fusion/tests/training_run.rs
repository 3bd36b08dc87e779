//! Full fusion runs against synthetic embedding sources on disk.

use std::cell::Cell;

use chrono::{DateTime, Local};
use molfuse_common::ExecutionContext;
use molfuse_fusion::{
    run_fusion, run_timestamp, train_fusion, BestCheckpoint, EmbeddingLoader, EmbeddingSplits,
    FusionError, LossHistory, RunPaths, SafetensorsEmbeddingLoader, TrainingConfig,
};
use molfuse_test_utils::pretty_assertions::assert_eq;
use molfuse_test_utils::{EmbeddingFixture, RunDirs, SplitSizes};

const SIZES: SplitSizes = SplitSizes {
    train: 96,
    val: 32,
    test: 16,
};

fn small_config(epochs: usize) -> TrainingConfig {
    TrainingConfig::default()
        .with_epochs(epochs)
        .with_batch_size(16)
        .with_hidden_dims(vec![16, 8])
}

fn paths(dirs: &RunDirs) -> RunPaths {
    RunPaths {
        embed_dir: dirs.embed_dir.clone(),
        checkpoint_dir: dirs.checkpoint_dir.clone(),
        loss_dir: dirs.loss_dir.clone(),
    }
}

#[test]
fn test_run_writes_matching_artifacts() {
    let dirs = RunDirs::new().unwrap();
    EmbeddingFixture::new(6, 4, SIZES, 1)
        .write(&dirs.embed_dir, "gnn", "llm")
        .unwrap();
    let loader = SafetensorsEmbeddingLoader::new(&dirs.embed_dir);

    let run = run_fusion(
        &loader,
        "gnn",
        "llm",
        &small_config(8),
        &paths(&dirs),
        &ExecutionContext::cpu(3),
    )
    .unwrap();

    let epoch = run.outcome.best.epoch().unwrap();
    let checkpoints = RunDirs::list(&dirs.checkpoint_dir).unwrap();
    let losses = RunDirs::list(&dirs.loss_dir).unwrap();
    assert_eq!(checkpoints.len(), 1);
    assert_eq!(losses.len(), 1);
    assert!(checkpoints[0].starts_with("fusion_"));
    assert!(checkpoints[0].ends_with(&format!("_epoch_{epoch}.safetensors")));
    assert_eq!(
        checkpoints[0].trim_end_matches(".safetensors"),
        losses[0].trim_end_matches(".csv")
    );

    let table = LossHistory::read_csv(&run.artifacts.losses).unwrap();
    assert_eq!(table.len(), 8);
    assert_eq!(table, run.outcome.history);

    let saved = BestCheckpoint::load_params(&run.artifacts.checkpoint, &candle_core::Device::Cpu)
        .unwrap();
    let mut names: Vec<_> = saved.keys().cloned().collect();
    names.sort();
    assert_eq!(
        names,
        vec!["fc0.bias", "fc0.weight", "fc1.bias", "fc1.weight", "fc2.bias", "fc2.weight"]
    );
}

#[test]
fn test_best_epoch_is_first_argmin_of_validation() {
    let (graph, lm) = EmbeddingFixture::new(5, 3, SIZES, 7).tensors().unwrap();
    let splits = EmbeddingSplits::fuse(&graph, &lm).unwrap();
    let outcome = train_fusion(&splits, &small_config(12), &ExecutionContext::cpu(7)).unwrap();

    let history = &outcome.history;
    assert_eq!(outcome.best.epoch(), history.best_epoch());
    let minima = history.running_min_val();
    assert_eq!(outcome.best.val_loss(), *minima.last().unwrap());
    assert!(minima.windows(2).all(|w| w[1] <= w[0]));
}

#[test]
fn test_same_seed_same_losses() {
    let (graph, lm) = EmbeddingFixture::new(4, 4, SIZES, 11).tensors().unwrap();
    let splits = EmbeddingSplits::fuse(&graph, &lm).unwrap();

    let a = train_fusion(&splits, &small_config(5), &ExecutionContext::cpu(21)).unwrap();
    let b = train_fusion(&splits, &small_config(5), &ExecutionContext::cpu(21)).unwrap();
    assert_eq!(a.history, b.history);
    assert_eq!(a.test_loss, b.test_loss);
}

#[test]
fn test_training_reduces_loss_on_learnable_target() {
    let (graph, lm) = EmbeddingFixture::new(4, 2, SIZES, 5).tensors().unwrap();
    let splits = EmbeddingSplits::fuse(&graph, &lm).unwrap();
    let config = small_config(40).with_hidden_dims(vec![32, 16]);

    let outcome = train_fusion(&splits, &config, &ExecutionContext::cpu(2)).unwrap();
    let first = outcome.history.train[0];
    let last = *outcome.history.train.last().unwrap();
    assert!(last < first, "train loss did not drop: {first} -> {last}");
}

#[test]
fn test_mismatched_sources_are_rejected() {
    let dirs = RunDirs::new().unwrap();
    EmbeddingFixture::new(3, 3, SIZES, 1)
        .write(&dirs.embed_dir, "gnn", "unused")
        .unwrap();
    let other = SplitSizes {
        train: SIZES.train + 1,
        ..SIZES
    };
    EmbeddingFixture::new(3, 3, other, 1)
        .write(&dirs.embed_dir, "unused", "llm")
        .unwrap();

    let loader = SafetensorsEmbeddingLoader::new(&dirs.embed_dir);
    assert!(matches!(
        loader.load("gnn", "llm"),
        Err(FusionError::Embeddings(_))
    ));
}

#[test]
fn test_tiny_dataset_single_epoch_writes_epoch_zero() {
    let dirs = RunDirs::new().unwrap();
    let sizes = SplitSizes {
        train: 3,
        val: 3,
        test: 3,
    };
    // 2 graph + 2 language-model features, one batch of 64 covers everything
    EmbeddingFixture::new(2, 2, sizes, 4)
        .write(&dirs.embed_dir, "gnn", "llm")
        .unwrap();
    let loader = SafetensorsEmbeddingLoader::new(&dirs.embed_dir);
    let config = TrainingConfig::default().with_epochs(1);

    let run = run_fusion(
        &loader,
        "gnn",
        "llm",
        &config,
        &paths(&dirs),
        &ExecutionContext::cpu(0),
    )
    .unwrap();

    assert_eq!(run.outcome.input_dim, 4);
    assert_eq!(run.outcome.best.epoch(), Some(0));
    let checkpoints = RunDirs::list(&dirs.checkpoint_dir).unwrap();
    assert_eq!(checkpoints.len(), 1);
    assert!(checkpoints[0].ends_with("_epoch_0.safetensors"), "{}", checkpoints[0]);
    assert!(run.artifacts.losses.ends_with(checkpoints[0].replace(".safetensors", ".csv")));

    let table = LossHistory::read_csv(&run.artifacts.losses).unwrap();
    assert_eq!(table.train.len(), 1);
    assert_eq!(table.val.len(), 1);
}

/// Records when the embeddings finished loading.
struct TimedLoader {
    inner: SafetensorsEmbeddingLoader,
    loaded_at: Cell<Option<DateTime<Local>>>,
}

impl EmbeddingLoader for TimedLoader {
    fn load(&self, graph_source: &str, lm_source: &str) -> molfuse_fusion::Result<EmbeddingSplits> {
        let splits = self.inner.load(graph_source, lm_source)?;
        self.loaded_at.set(Some(Local::now()));
        Ok(splits)
    }
}

#[test]
fn test_artifacts_are_stamped_after_training() {
    let dirs = RunDirs::new().unwrap();
    EmbeddingFixture::new(3, 3, SIZES, 8)
        .write(&dirs.embed_dir, "gnn", "llm")
        .unwrap();
    let loader = TimedLoader {
        inner: SafetensorsEmbeddingLoader::new(&dirs.embed_dir),
        loaded_at: Cell::new(None),
    };

    let run = run_fusion(
        &loader,
        "gnn",
        "llm",
        &small_config(3),
        &paths(&dirs),
        &ExecutionContext::cpu(1),
    )
    .unwrap();

    let loaded_at = loader.loaded_at.get().unwrap();
    assert!(run.outcome.finished_at > loaded_at);

    let stamp = run_timestamp(&run.outcome.finished_at);
    let name = run.artifacts.checkpoint.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with(&format!("fusion_{stamp}_epoch_")), "{name}");
}
