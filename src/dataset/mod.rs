//! MNIST loading, train/valid partitioning and batching.

pub mod batcher;
pub mod mnist;
pub mod split;

pub use batcher::{MnistBatch, MnistBatcher};
pub use mnist::{HEIGHT, MnistDataset, MnistItem, NUM_CLASSES, Split, WIDTH};
pub use split::{MnistPartition, train_valid_split};
