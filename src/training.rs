use crate::artifacts::Artifacts;
use crate::backend::RecorderTy;
use crate::config::TrainingConfig;
use crate::dataset::{MnistBatcher, MnistDataset, train_valid_split};
use crate::error::{Error, Result};
use crate::model::MlpClassifier;
use burn::{
    data::dataloader::DataLoaderBuilder,
    prelude::*,
    tensor::backend::AutodiffBackend,
    train::{
        LearnerBuilder,
        metric::{AccuracyMetric, LossMetric},
        renderer::{MetricState, MetricsRenderer, TrainingProgress},
    },
};
use std::path::Path;
use std::time::Instant;

/// Trains a fresh model (or resumes from the learner checkpoint of `resume`)
/// on the training partition, validating on the held-out partition after
/// each epoch. The learner checkpoints every epoch and writes its metric logs
/// into the artifacts directory; the final model is saved there as well.
pub fn fit<B: AutodiffBackend>(
    config: &TrainingConfig,
    dataset_root: &Path,
    artifacts: &Artifacts,
    resume: Option<usize>,
    device: B::Device,
) -> Result<MlpClassifier<B>> {
    fit_with_dashboard(config, dataset_root, artifacts, resume, device, true)
}

/// Without `dashboard`, the learner neither draws its terminal UI nor installs
/// its own application logger.
fn fit_with_dashboard<B: AutodiffBackend>(
    config: &TrainingConfig,
    dataset_root: &Path,
    artifacts: &Artifacts,
    resume: Option<usize>,
    device: B::Device,
    dashboard: bool,
) -> Result<MlpClassifier<B>> {
    if let Some(epoch) = resume {
        if !artifacts.checkpoint_epochs()?.contains(&epoch) {
            return Err(Error::MissingModel(artifacts.checkpoint_path::<B>(epoch)));
        }
    }

    B::seed(&device, config.seed);

    let dataset = MnistDataset::train(dataset_root)?;
    let (dataset_train, dataset_valid) =
        train_valid_split(dataset, config.valid_size, config.seed)?;

    let batcher = MnistBatcher::default();

    let mut builder_train = DataLoaderBuilder::new(batcher.clone())
        .batch_size(config.batch_size)
        .shuffle(config.seed);
    let mut builder_valid = DataLoaderBuilder::new(batcher).batch_size(config.batch_size);
    // zero workers means loading on the calling thread
    if config.num_workers > 0 {
        builder_train = builder_train.num_workers(config.num_workers);
        builder_valid = builder_valid.num_workers(config.num_workers);
    }
    let dataloader_train = builder_train.build(dataset_train);
    let dataloader_valid = builder_valid.build(dataset_valid);

    let artifact_dir = artifacts.root().to_str().ok_or_else(|| {
        Error::InvalidArgument(format!(
            "artifacts path {:?} is not valid UTF-8",
            artifacts.root()
        ))
    })?;

    let mut builder = LearnerBuilder::new(artifact_dir)
        .metric_train_numeric(AccuracyMetric::new())
        .metric_valid_numeric(AccuracyMetric::new())
        .metric_train_numeric(LossMetric::new())
        .metric_valid_numeric(LossMetric::new())
        .with_file_checkpointer(RecorderTy::new())
        .devices(vec![device.clone()])
        .num_epochs(config.num_epochs)
        .summary();
    if let Some(epoch) = resume {
        log::info!("Resuming training from the checkpoint of epoch {epoch}");
        builder = builder.checkpoint(epoch);
    }
    if !dashboard {
        builder = builder
            .renderer(SilentRenderer)
            .with_application_logger(None);
    }

    let model = config.model.init::<B>(&device);
    log::info!("Model has {} parameters", model.num_params());
    let learner = builder.build(model, config.optimizer.init(), config.learning_rate);

    let now = Instant::now();
    let model_trained = learner.fit(dataloader_train, dataloader_valid);
    let elapsed = now.elapsed().as_secs();
    println!("Training completed in {}m{}s", elapsed / 60, elapsed % 60);

    artifacts.save_model(&model_trained)?;

    Ok(model_trained)
}

/// Discards the learner's progress updates.
struct SilentRenderer;

impl MetricsRenderer for SilentRenderer {
    fn update_train(&mut self, _state: MetricState) {}

    fn update_valid(&mut self, _state: MetricState) {}

    fn render_train(&mut self, _item: TrainingProgress) {}

    fn render_valid(&mut self, _item: TrainingProgress) {}
}
