use crate::dataset::{HEIGHT, MnistBatch, NUM_CLASSES, WIDTH};
use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig, Relu, loss::CrossEntropyLossConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
    train::{ClassificationOutput, TrainOutput, TrainStep, ValidStep},
};

/// Two dense layers with a ReLU and dropout in between.
///
/// With the defaults, reaches ~97.8% test accuracy after 5 epochs of Adam at lr=1e-3.
#[derive(Config, Debug)]
pub struct MlpClassifierConfig {
    #[config(default = "WIDTH * HEIGHT")]
    pub input_size: usize,
    #[config(default = 128)]
    pub hidden_size: usize,
    #[config(default = "NUM_CLASSES")]
    pub num_classes: usize,
    /// Probability of zeroing a hidden activation during training.
    #[config(default = 0.2)]
    pub dropout: f64,
}

#[derive(Module, Debug)]
pub struct MlpClassifier<B: Backend> {
    pub hidden: Linear<B>,
    pub activation: Relu,
    pub dropout: Dropout,
    pub output: Linear<B>,
}

impl MlpClassifierConfig {
    /// Returns the initialized model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> MlpClassifier<B> {
        let hidden = LinearConfig::new(self.input_size, self.hidden_size)
            .with_bias(true)
            .init(device);
        let output = LinearConfig::new(self.hidden_size, self.num_classes)
            .with_bias(true)
            .init(device);
        MlpClassifier {
            hidden,
            activation: Relu::new(),
            dropout: DropoutConfig::new(self.dropout).init(),
            output,
        }
    }
}

impl<B: Backend> MlpClassifier<B> {
    /// Maps flattened images to unnormalized class scores.
    ///
    /// # Shapes
    /// - input: [batch_size, input_size]
    /// - output: [batch_size, num_classes]
    pub fn forward(&self, images: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch_size, _input_size] = images.dims();
        let [_input_size, hidden_size] = self.hidden.weight.dims();
        let [_hidden_size, num_classes] = self.output.weight.dims();

        let x = self.hidden.forward(images);
        let x = self.activation.forward(x);
        let x = self.dropout.forward(x);
        assert_eq!([batch_size, hidden_size], x.dims());

        let x = self.output.forward(x);
        assert_eq!([batch_size, num_classes], x.dims());
        x
    }

    pub fn forward_classification(
        &self,
        images: Tensor<B, 2>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B> {
        let [batch_size, _] = images.dims();
        assert_eq!([batch_size], targets.dims());

        let output = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput::new(loss, output, targets)
    }
}

impl<B: AutodiffBackend> TrainStep<MnistBatch<B>, ClassificationOutput<B>> for MlpClassifier<B> {
    fn step(&self, batch: MnistBatch<B>) -> TrainOutput<ClassificationOutput<B>> {
        let item = self.forward_classification(batch.images, batch.targets);

        TrainOutput::new(self, item.loss.backward(), item)
    }
}

impl<B: Backend> ValidStep<MnistBatch<B>, ClassificationOutput<B>> for MlpClassifier<B> {
    fn step(&self, batch: MnistBatch<B>) -> ClassificationOutput<B> {
        self.forward_classification(batch.images, batch.targets)
    }
}
