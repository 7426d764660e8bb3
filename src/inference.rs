use crate::artifacts::Artifacts;
use crate::config::TrainingConfig;
use crate::dataset::{MnistBatch, MnistBatcher, MnistDataset, MnistItem};
use crate::error::{Error, Result};
use crate::model::MlpClassifier;
use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use burn::tensor::activation::softmax;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: u8,
    pub predicted: u8,
    /// Softmax probability of `predicted`.
    pub confidence: f32,
}

impl Prediction {
    pub fn is_correct(&self) -> bool {
        self.label == self.predicted
    }
}

pub fn predict<B: Backend>(
    model: &MlpClassifier<B>,
    items: Vec<MnistItem>,
    device: &B::Device,
) -> Result<Vec<Prediction>> {
    if items.is_empty() {
        return Ok(vec![]);
    }
    let labels: Vec<u8> = items.iter().map(|item| item.label).collect();
    let batch: MnistBatch<B> = MnistBatcher::default().batch(items, device);

    let probabilities = softmax(model.forward(batch.images), 1);
    let confidences = probabilities.clone().max_dim(1).flatten::<1>(0, 1);
    let predicted = probabilities.argmax(1).flatten::<1>(0, 1);

    let confidences = confidences
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()?;
    let predicted = predicted
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()?;

    let predictions = labels
        .into_iter()
        .zip(predicted)
        .zip(confidences)
        .map(|((label, predicted), confidence)| Prediction {
            label,
            predicted: predicted as u8,
            confidence,
        })
        .collect();
    Ok(predictions)
}

/// Classifies the first `num_samples` test images with the trained model and
/// prints predicted against actual digits.
pub fn infer<B: Backend>(
    config: &TrainingConfig,
    dataset_root: &Path,
    artifacts: &Artifacts,
    num_samples: usize,
    device: B::Device,
) -> Result<Vec<Prediction>> {
    let model = artifacts
        .load_model::<B>(&config.model, &device)?
        .ok_or_else(|| Error::MissingModel(artifacts.model_path::<B>()))?;

    let dataset = MnistDataset::test(dataset_root)?;
    let items: Vec<MnistItem> = (0..num_samples.min(dataset.len()))
        .filter_map(|index| dataset.get(index))
        .collect();

    let predictions = predict(&model, items, &device)?;
    for (index, prediction) in predictions.iter().enumerate() {
        println!(
            "#{index:0>4} label {} predicted {} ({:.1}%){}",
            prediction.label,
            prediction.predicted,
            prediction.confidence * 100.0,
            if prediction.is_correct() { "" } else { "  <- wrong" }
        );
    }
    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::mnist::tests::synthetic;
    use crate::model::MlpClassifierConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn one_prediction_per_item() {
        let device = Default::default();
        let model = MlpClassifierConfig::new()
            .with_hidden_size(8)
            .init::<TestBackend>(&device);
        let dataset = synthetic(6);
        let items: Vec<_> = dataset.iter().collect();

        let predictions = predict(&model, items, &device).unwrap();

        assert_eq!(predictions.len(), 6);
        for (index, prediction) in predictions.iter().enumerate() {
            assert_eq!(prediction.label as usize, index % 10);
            assert!(prediction.predicted < 10);
            // the arg max of 10 probabilities is at least uniform
            assert!(prediction.confidence >= 0.1 - 1e-6 && prediction.confidence <= 1.0);
        }
    }

    #[test]
    fn empty_input_yields_nothing() {
        let device = Default::default();
        let model = MlpClassifierConfig::new().init::<TestBackend>(&device);
        assert!(predict(&model, vec![], &device).unwrap().is_empty());
    }
}
