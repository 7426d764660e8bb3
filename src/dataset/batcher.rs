use super::mnist::{HEIGHT, MnistItem, WIDTH};
use crate::backend::Element;
use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;

/// Mean and standard deviation of the MNIST training brightness, scaled to [0, 1].
// values from the PyTorch MNIST example
// https://github.com/pytorch/examples/blob/54f4572509891883a947411fd7239237dd2a39c3/mnist/main.py#L122
pub const MEAN: f64 = 0.1307;
pub const STD: f64 = 0.3081;

#[derive(Clone, Default)]
pub struct MnistBatcher {}

#[derive(Clone, Debug)]
pub struct MnistBatch<B: Backend> {
    /// Flattened images, z-score normalized (mean=0.0, stddev=1.0):
    /// `z = (value / 255 - MEAN) / STD`.
    ///
    /// # Shape
    /// [batch_size, WIDTH * HEIGHT]
    pub images: Tensor<B, 2>,
    /// # Shape
    /// [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> Batcher<B, MnistItem, MnistBatch<B>> for MnistBatcher {
    fn batch(&self, items: Vec<MnistItem>, device: &B::Device) -> MnistBatch<B> {
        let (items_image, items_label): (Vec<_>, Vec<_>) = items
            .into_iter()
            .map(|item| (item.image, item.label))
            .unzip();
        let images = items_image
            .into_iter()
            .map(|image: Vec<Element>| {
                TensorData::new(image, [1, WIDTH * HEIGHT]).convert::<B::FloatElem>()
            })
            .map(|data| Tensor::<B, 2>::from_data(data, device))
            .map(|tensor| ((tensor / 255) - MEAN) / STD)
            .collect();

        let targets = items_label
            .into_iter()
            .map(|label: u8| {
                Tensor::<B, 1, Int>::from_data([(label as i64).elem::<B::IntElem>()], device)
            })
            .collect();

        let images = Tensor::cat(images, 0);
        let targets = Tensor::cat(targets, 0);

        MnistBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::mnist::tests::synthetic;
    use burn::backend::NdArray;
    use burn::data::dataset::Dataset;

    type TestBackend = NdArray<f32>;

    #[test]
    fn batch_is_flattened_and_normalized() {
        let dataset = synthetic(4);
        let items = vec![dataset.get(0).unwrap(), dataset.get(3).unwrap()];
        let device = Default::default();

        let batch: MnistBatch<TestBackend> = MnistBatcher::default().batch(items, &device);

        assert_eq!(batch.images.dims(), [2, WIDTH * HEIGHT]);
        assert_eq!(batch.targets.dims(), [2]);

        let targets = batch.targets.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(targets, vec![0, 3]);

        let images = batch.images.into_data().to_vec::<f32>().unwrap();
        let black = ((0.0 - MEAN) / STD) as f32;
        let dim = ((3.0 / 255.0 - MEAN) / STD) as f32;
        assert!((images[0] - black).abs() < 1e-4);
        assert!((images[WIDTH * HEIGHT] - dim).abs() < 1e-4);
    }
}
