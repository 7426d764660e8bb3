use crate::backend::Element;
use crate::error::{Error, Result};
use burn::data::dataset::{
    Dataset, InMemDataset,
    transform::{Mapper, MapperDataset},
};
use burn_dataset::network::downloader::download_file_as_bytes;
use flate2::read::GzDecoder;
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};
use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

// CVDF mirror of http://yann.lecun.com/exdb/mnist/
const URL: &str = "https://storage.googleapis.com/cvdf-datasets/mnist/";
const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

const IMAGES_MAGIC: u32 = 2051;
const LABELS_MAGIC: u32 = 2049;

pub const WIDTH: usize = 28;
pub const HEIGHT: usize = 28;
pub const NUM_CLASSES: usize = 10;

/// Which of the two shipped MNIST files to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// 60,000 images, later divided into train and validation partitions.
    Train,
    /// 10,000 held-out images.
    Test,
}

impl Split {
    pub(crate) fn dir_name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }

    pub(crate) fn images_file(&self) -> &'static str {
        match self {
            Split::Train => TRAIN_IMAGES,
            Split::Test => TEST_IMAGES,
        }
    }

    pub(crate) fn labels_file(&self) -> &'static str {
        match self {
            Split::Train => TRAIN_LABELS,
            Split::Test => TEST_LABELS,
        }
    }
}

/// MNIST item.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MnistItem {
    /// Image as a flat array of floats.
    /// Each value is a brightness, in between 0.0 and 255.0.
    ///
    /// # Shape
    /// [WIDTH * HEIGHT]
    pub image: Vec<Element>,

    /// Label of the image.
    /// Each value is in between 0 and 9.
    pub label: u8,
}

#[derive(Deserialize, Debug, Clone)]
struct MnistItemRaw {
    pub image_bytes: Vec<u8>,
    pub label: u8,
}

struct BytesToImage;

impl Mapper<MnistItemRaw, MnistItem> for BytesToImage {
    /// Convert a raw MNIST item (image bytes) to a MNIST item (flat array image).
    fn map(&self, item: &MnistItemRaw) -> MnistItem {
        debug_assert_eq!(item.image_bytes.len(), WIDTH * HEIGHT);

        let image: Vec<Element> = item
            .image_bytes
            .iter()
            .map(|brightness| {
                let element: Element = (*brightness).as_();
                element
            })
            .collect();

        MnistItem {
            image,
            label: item.label,
        }
    }
}

type MappedDataset = MapperDataset<InMemDataset<MnistItemRaw>, BytesToImage, MnistItemRaw>;

/// The MNIST dataset consists of 70,000 28x28 black-and-white images in 10 classes (one for each digits), with 7,000
/// images per class. There are 60,000 training images and 10,000 test images.
///
/// The data is downloaded from the [CVDF mirror](https://github.com/cvdfoundation/mnist) into a local
/// directory and kept there for later runs.
pub struct MnistDataset {
    dataset: MappedDataset,
}

impl Dataset<MnistItem> for MnistDataset {
    fn get(&self, index: usize) -> Option<MnistItem> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl MnistDataset {
    /// Loads the 60,000 training images from `root`, downloading them if needed.
    pub fn train(root: &Path) -> Result<Self> {
        Self::load(root, Split::Train)
    }

    /// Loads the 10,000 test images from `root`, downloading them if needed.
    pub fn test(root: &Path) -> Result<Self> {
        Self::load(root, Split::Test)
    }

    pub fn load(root: &Path, split: Split) -> Result<Self> {
        let split_dir = Self::download(root, split)?;

        // MNIST is tiny so we can load it in-memory
        // Train images (u8): 28 * 28 * 60000 = 47.04Mb
        // Test images (u8): 28 * 28 * 10000 = 7.84Mb
        let images_path = split_dir.join(split.images_file());
        let images = std::fs::read(&images_path).map_err(Error::io(&images_path))?;
        let images = parse_idx_images(&images)?;

        let labels_path = split_dir.join(split.labels_file());
        let labels = std::fs::read(&labels_path).map_err(Error::io(&labels_path))?;
        let labels = parse_idx_labels(&labels)?;

        log::info!(
            "Loaded {} MNIST {} images from {split_dir:?}",
            images.len(),
            split.dir_name()
        );
        Self::from_raw(images, labels)
    }

    /// Builds the dataset from already decoded images (`WIDTH * HEIGHT` bytes each) and labels.
    pub fn from_raw(images: Vec<Vec<u8>>, labels: Vec<u8>) -> Result<Self> {
        if images.len() != labels.len() {
            return Err(Error::Dataset(format!(
                "{} images but {} labels",
                images.len(),
                labels.len()
            )));
        }
        if let Some(image) = images.iter().find(|image| image.len() != WIDTH * HEIGHT) {
            return Err(Error::Dataset(format!(
                "image has {} pixels, expected {}",
                image.len(),
                WIDTH * HEIGHT
            )));
        }
        if let Some(label) = labels.iter().find(|label| **label as usize >= NUM_CLASSES) {
            return Err(Error::Dataset(format!("label {label} out of range")));
        }

        let items: Vec<_> = images
            .into_iter()
            .zip(labels)
            .map(|(image_bytes, label)| MnistItemRaw { image_bytes, label })
            .collect();

        let dataset = InMemDataset::new(items);
        let dataset = MapperDataset::new(dataset, BytesToImage);

        Ok(Self { dataset })
    }

    /// Makes sure both files of `split` exist under `root/<split>`.
    fn download(root: &Path, split: Split) -> Result<PathBuf> {
        let split_dir = root.join(split.dir_name());

        if !split_dir.exists() {
            create_dir_all(&split_dir).map_err(Error::io(&split_dir))?;
        }

        Self::download_file(split.images_file(), &split_dir)?;
        Self::download_file(split.labels_file(), &split_dir)?;

        Ok(split_dir)
    }

    /// Download a file from the MNIST dataset URL to the destination directory.
    /// File download progress is reported with the help of a progress bar.
    fn download_file(name: &str, dest_dir: &Path) -> Result<PathBuf> {
        let file_name = dest_dir.join(name);

        if !file_name.exists() {
            log::info!("Downloading {name} into {dest_dir:?}");
            let bytes = download_file_as_bytes(&format!("{URL}{name}.gz"), name);
            gunzip_into(&bytes, &file_name)?;
        }

        Ok(file_name)
    }
}

/// Decompresses a downloaded gzip payload into `file_name`.
fn gunzip_into(bytes: &[u8], file_name: &Path) -> Result<()> {
    let mut output_file = File::create(file_name).map_err(Error::io(file_name))?;

    let mut gz_buffer = GzDecoder::new(bytes);
    if let Err(err) = std::io::copy(&mut gz_buffer, &mut output_file) {
        // do not leave a truncated file behind, it would be picked up by the next run
        drop(output_file);
        std::fs::remove_file(file_name).ok();
        return Err(Error::Dataset(format!(
            "could not decompress {file_name:?}: {err}"
        )));
    }
    Ok(())
}

/// Default dataset root, shared with the burn-dataset cache.
pub fn default_root() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".cache").join("burn-dataset").join("mnist"))
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|buf| u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
        .ok_or_else(|| Error::Dataset("truncated IDX header".to_string()))
}

/// Parses an IDX3 image file: 16-byte header (magic, count, rows, cols) followed
/// by `count * rows * cols` brightness bytes.
pub fn parse_idx_images(bytes: &[u8]) -> Result<Vec<Vec<u8>>> {
    let magic = read_u32(bytes, 0)?;
    if magic != IMAGES_MAGIC {
        return Err(Error::Dataset(format!(
            "bad image file magic number {magic}, expected {IMAGES_MAGIC}"
        )));
    }
    let size = read_u32(bytes, 4)? as usize;
    let rows = read_u32(bytes, 8)? as usize;
    let cols = read_u32(bytes, 12)? as usize;
    if (rows, cols) != (HEIGHT, WIDTH) {
        return Err(Error::Dataset(format!(
            "images are {rows}x{cols}, expected {HEIGHT}x{WIDTH}"
        )));
    }

    let pixels = bytes
        .get(16..16 + size * WIDTH * HEIGHT)
        .ok_or_else(|| Error::Dataset(format!("image file truncated, expected {size} images")))?;

    Ok(pixels
        .chunks(WIDTH * HEIGHT)
        .map(|chunk| chunk.to_vec())
        .collect())
}

/// Parses an IDX1 label file: 8-byte header (magic, count) followed by `count` label bytes.
pub fn parse_idx_labels(bytes: &[u8]) -> Result<Vec<u8>> {
    let magic = read_u32(bytes, 0)?;
    if magic != LABELS_MAGIC {
        return Err(Error::Dataset(format!(
            "bad label file magic number {magic}, expected {LABELS_MAGIC}"
        )));
    }
    let size = read_u32(bytes, 4)? as usize;

    bytes
        .get(8..8 + size)
        .map(|labels| labels.to_vec())
        .ok_or_else(|| Error::Dataset(format!("label file truncated, expected {size} labels")))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use temp_dir::TempDir;

    pub(crate) fn idx_images(images: &[Vec<u8>]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend(IMAGES_MAGIC.to_be_bytes());
        bytes.extend((images.len() as u32).to_be_bytes());
        bytes.extend((HEIGHT as u32).to_be_bytes());
        bytes.extend((WIDTH as u32).to_be_bytes());
        for image in images {
            bytes.extend(image);
        }
        bytes
    }

    pub(crate) fn idx_labels(labels: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend(LABELS_MAGIC.to_be_bytes());
        bytes.extend((labels.len() as u32).to_be_bytes());
        bytes.extend(labels);
        bytes
    }

    /// Image `i` is filled with the brightness `i`, its label is `i % 10`.
    pub(crate) fn synthetic(n: usize) -> MnistDataset {
        let images = (0..n).map(|i| vec![i as u8; WIDTH * HEIGHT]).collect();
        let labels = (0..n).map(|i| (i % NUM_CLASSES) as u8).collect();
        MnistDataset::from_raw(images, labels).unwrap()
    }

    #[test]
    fn parses_images_and_labels() {
        let images = vec![vec![0u8; WIDTH * HEIGHT], vec![255u8; WIDTH * HEIGHT]];
        let parsed = parse_idx_images(&idx_images(&images)).unwrap();
        assert_eq!(parsed, images);

        let labels = parse_idx_labels(&idx_labels(&[3, 7])).unwrap();
        assert_eq!(labels, vec![3, 7]);
    }

    #[test]
    fn rejects_bad_magic() {
        let labels = idx_labels(&[1]);
        assert!(matches!(parse_idx_images(&labels), Err(Error::Dataset(_))));
        let images = idx_images(&[vec![0u8; WIDTH * HEIGHT]]);
        assert!(matches!(parse_idx_labels(&images), Err(Error::Dataset(_))));
    }

    #[test]
    fn rejects_truncated_payload() {
        let mut bytes = idx_images(&[vec![1u8; WIDTH * HEIGHT], vec![2u8; WIDTH * HEIGHT]]);
        bytes.truncate(bytes.len() - 1);
        assert!(parse_idx_images(&bytes).is_err());

        let mut bytes = idx_labels(&[1, 2, 3]);
        bytes.pop();
        assert!(parse_idx_labels(&bytes).is_err());

        assert!(parse_idx_labels(&[0, 0]).is_err());
    }

    #[test]
    fn from_raw_validates_shapes_and_labels() {
        let image = vec![0u8; WIDTH * HEIGHT];
        assert!(MnistDataset::from_raw(vec![image.clone()], vec![]).is_err());
        assert!(MnistDataset::from_raw(vec![vec![0u8; 10]], vec![1]).is_err());
        assert!(MnistDataset::from_raw(vec![image], vec![10]).is_err());
    }

    #[test]
    fn items_are_converted_to_brightness() {
        let dataset = synthetic(12);
        assert_eq!(dataset.len(), 12);

        let item = dataset.get(11).unwrap();
        assert_eq!(item.label, 1);
        assert_eq!(item.image.len(), WIDTH * HEIGHT);
        let expected: Element = 11u8.as_();
        assert!(item.image.iter().all(|pixel| *pixel == expected));
        assert!(dataset.get(12).is_none());
    }

    #[test]
    fn loads_existing_files_without_download() {
        let root = TempDir::new().unwrap();
        let split_dir = root.path().join("test");
        std::fs::create_dir_all(&split_dir).unwrap();

        let images: Vec<_> = (0..5).map(|i| vec![i as u8; WIDTH * HEIGHT]).collect();
        std::fs::write(split_dir.join(TEST_IMAGES), idx_images(&images)).unwrap();
        std::fs::write(split_dir.join(TEST_LABELS), idx_labels(&[0, 1, 2, 3, 4])).unwrap();

        let dataset = MnistDataset::test(root.path()).unwrap();
        assert_eq!(dataset.len(), 5);
        assert_eq!(dataset.get(4).unwrap().label, 4);
    }

    #[test]
    fn corrupt_download_is_a_dataset_error() {
        let root = TempDir::new().unwrap();
        let file_name = root.path().join(TRAIN_LABELS);

        let err = gunzip_into(b"certainly not gzip", &file_name).unwrap_err();

        assert!(matches!(err, Error::Dataset(_)));
        assert!(!file_name.exists());
    }

    #[test]
    fn gzip_payload_is_decompressed() {
        use flate2::{Compression, write::GzEncoder};
        use std::io::Write;

        let root = TempDir::new().unwrap();
        let file_name = root.path().join(TRAIN_LABELS);
        let labels = idx_labels(&[4, 2]);
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&labels).unwrap();
        let compressed = encoder.finish().unwrap();

        gunzip_into(&compressed, &file_name).unwrap();

        assert_eq!(std::fs::read(&file_name).unwrap(), labels);
    }
}
