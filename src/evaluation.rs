use crate::artifacts::Artifacts;
use crate::config::TrainingConfig;
use crate::dataset::{MnistBatch, MnistBatcher, MnistDataset, MnistItem, NUM_CLASSES};
use crate::error::{Error, Result};
use crate::model::MlpClassifier;
use burn::data::dataloader::{DataLoader, DataLoaderBuilder, Progress};
use burn::data::dataset::Dataset;
use burn::prelude::*;
use burn::train::metric::{AccuracyMetric, Adaptor, LossMetric, Metric, MetricMetadata, Numeric};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

type Dataloader<B> = Arc<dyn DataLoader<B, MnistBatch<B>> + 'static>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassStats {
    pub total: usize,
    pub correct: usize,
}

impl ClassStats {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// Scalar metrics of a model over a whole partition.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub num_items: usize,
    /// Mean cross-entropy.
    pub loss: f64,
    /// Fraction of correctly classified images, in [0, 1].
    pub accuracy: f64,
    pub per_class: [ClassStats; NUM_CLASSES],
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Test items {}, Loss {:.4}, Accuracy {:.4}",
            self.num_items, self.loss, self.accuracy
        )?;
        for (digit, stats) in self.per_class.iter().enumerate() {
            writeln!(
                f,
                "  digit {digit}: {:>5}/{:<5} {:.4}",
                stats.correct,
                stats.total,
                stats.accuracy()
            )?;
        }
        Ok(())
    }
}

/// Reads back the trained model (or the learner checkpoint of `checkpoint`)
/// and evaluates it on the test split.
pub fn test<B: Backend>(
    config: &TrainingConfig,
    dataset_root: &Path,
    artifacts: &Artifacts,
    checkpoint: Option<usize>,
    device: B::Device,
) -> Result<EvaluationReport> {
    let model = match checkpoint {
        Some(epoch) => artifacts
            .load_checkpoint::<B>(&config.model, epoch, &device)?
            .ok_or_else(|| Error::MissingModel(artifacts.checkpoint_path::<B>(epoch)))?,
        None => artifacts
            .load_model::<B>(&config.model, &device)?
            .ok_or_else(|| Error::MissingModel(artifacts.model_path::<B>()))?,
    };

    let dataset = MnistDataset::test(dataset_root)?;
    let report = evaluate(
        model,
        dataset,
        config.batch_size,
        config.num_workers,
        &device,
    )?;
    log::info!("Test loss {:.4}, accuracy {:.4}", report.loss, report.accuracy);
    Ok(report)
}

/// Runs `model` over every item of `dataset` and aggregates loss, accuracy and
/// per-class correctness.
pub fn evaluate<B: Backend, D: Dataset<MnistItem> + 'static>(
    model: MlpClassifier<B>,
    dataset: D,
    batch_size: usize,
    num_workers: usize,
    device: &B::Device,
) -> Result<EvaluationReport> {
    let mut builder = DataLoaderBuilder::new(MnistBatcher::default()).batch_size(batch_size);
    if num_workers > 0 {
        builder = builder.num_workers(num_workers);
    }
    let dataloader: Dataloader<B> = builder.build(dataset);
    let num_items = dataloader.num_items();

    let mut metric_meta = MetricMetadata {
        progress: Progress::new(0, num_items),
        epoch: 1,
        epoch_total: 1,
        iteration: 0,
        lr: None,
    };
    let mut loss_metric = LossMetric::<B>::new();
    let mut acc_metric = AccuracyMetric::<B>::new();
    let mut per_class = [ClassStats::default(); NUM_CLASSES];

    for batch in dataloader.iter() {
        let [batch_size, _] = batch.images.dims();
        metric_meta.iteration += 1;
        metric_meta.progress.items_processed += batch_size;

        // the loader batches on the default device
        let images = batch.images.to_device(device);
        let targets = batch.targets.to_device(device);
        let output = model.forward_classification(images, targets);
        acc_metric.update(&output.adapt(), &metric_meta);
        loss_metric.update(&output.adapt(), &metric_meta);

        let predicted = output.output.argmax(1).flatten::<1>(0, 1);
        let predicted = predicted.into_data().convert::<i64>().to_vec::<i64>()?;
        let targets = output.targets.into_data().convert::<i64>().to_vec::<i64>()?;
        for (predicted, target) in predicted.into_iter().zip(targets) {
            let stats = &mut per_class[target as usize];
            stats.total += 1;
            stats.correct += (predicted == target) as usize;
        }
    }

    let num_items: usize = per_class.iter().map(|stats| stats.total).sum();
    if num_items == 0 {
        return Ok(EvaluationReport {
            num_items,
            loss: 0.0,
            accuracy: 0.0,
            per_class,
        });
    }

    Ok(EvaluationReport {
        num_items,
        loss: loss_metric.running_value().current(),
        // the metric reports a percentage
        accuracy: acc_metric.running_value().current() / 100.0,
        per_class,
    })
}
