use super::mnist::{MnistDataset, MnistItem};
use crate::error::{Error, Result};
use burn::data::dataset::{
    Dataset,
    transform::{PartialDataset, ShuffledDataset},
};
use std::sync::Arc;

/// One side of a [`train_valid_split`]: a window over a shared, shuffled dataset.
pub type MnistPartition = PartialDataset<Arc<ShuffledDataset<MnistDataset, MnistItem>>, MnistItem>;

/// Randomly divides `dataset` into a training and a validation partition.
///
/// The order is a seeded permutation, so the same `seed` always yields the same
/// partitions. The last `valid_size` shuffled items form the validation
/// partition; the two partitions are disjoint and together cover `dataset`.
pub fn train_valid_split(
    dataset: MnistDataset,
    valid_size: usize,
    seed: u64,
) -> Result<(MnistPartition, MnistPartition)> {
    let len = dataset.len();
    if valid_size == 0 || valid_size >= len {
        return Err(Error::InvalidArgument(format!(
            "validation size {valid_size} must be in 1..{len}"
        )));
    }

    let shuffled = Arc::new(ShuffledDataset::with_seed(dataset, seed));
    let train_size = len - valid_size;
    let train = PartialDataset::new(Arc::clone(&shuffled), 0, train_size);
    let valid = PartialDataset::new(shuffled, train_size, len);

    log::info!("Split {len} training images into {train_size} train / {valid_size} valid");
    Ok((train, valid))
}
