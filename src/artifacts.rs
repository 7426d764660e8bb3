//! Layout of the artifacts directory shared by training, evaluation and inference.
//!
//! ```text
//! <root>/training_config.json
//! <root>/model.mpk                  final model
//! <root>/checkpoint/model-<N>.mpk   learner checkpoint after epoch N
//! <root>/train/, <root>/valid/      learner metric logs
//! <root>/experiment.log             application log
//! ```

use crate::backend::RecorderTy;
use crate::config::TrainingConfig;
use crate::error::{Error, Result};
use crate::model::{MlpClassifier, MlpClassifierConfig};
use burn::prelude::*;
use burn::record::FileRecorder;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

pub const TRAINING_CONFIG_NAME: &str = "training_config.json";
pub const MODEL_NAME: &str = "model";
pub const CHECKPOINT_DIR: &str = "checkpoint";
/// Directories written by the learner during `fit`.
const RUN_DIRS: [&str; 3] = ["train", "valid", CHECKPOINT_DIR];

#[derive(Debug, Clone)]
pub struct Artifacts {
    root: PathBuf,
}

impl Artifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the directory. With `remove_previous`, the model, the
    /// checkpoints and the metric logs of an earlier run are deleted first;
    /// configs are kept.
    pub fn create(&self, remove_previous: bool) -> Result<()> {
        if remove_previous {
            log::info!(
                "removing previous model, checkpoints and metrics from {:?}",
                self.root
            );
            if self.root.exists() {
                let models = std::fs::read_dir(&self.root)
                    .map_err(Error::io(&self.root))?
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.path())
                    .filter(|path| {
                        path.is_file() && path.file_stem() == Some(OsStr::new(MODEL_NAME))
                    });
                for model in models {
                    std::fs::remove_file(&model).map_err(Error::io(&model))?;
                }
            }
            for dir in RUN_DIRS {
                let dir = self.root.join(dir);
                if dir.exists() {
                    std::fs::remove_dir_all(&dir).map_err(Error::io(&dir))?;
                }
            }
        }
        std::fs::create_dir_all(&self.root).map_err(Error::io(&self.root))
    }

    pub fn training_config_path(&self) -> PathBuf {
        self.root.join(TRAINING_CONFIG_NAME)
    }

    pub fn save_training_config(&self, config: &TrainingConfig) -> Result<()> {
        let path = self.training_config_path();
        log::info!("Saving training config into {path:?}");
        config.save(&path).map_err(Error::io(&path))
    }

    /// Returns `None` when no config was saved yet.
    pub fn load_training_config(&self) -> Result<Option<TrainingConfig>> {
        let path = self.training_config_path();
        if !std::fs::exists(&path).map_err(Error::io(&path))? {
            return Ok(None);
        }
        load_training_config(&path).map(Some)
    }

    /// Path without the recorder extension, which burn appends on its own.
    fn model_stem(&self) -> PathBuf {
        self.root.join(MODEL_NAME)
    }

    pub fn model_path<B: Backend>(&self) -> PathBuf {
        with_recorder_extension::<B>(self.model_stem())
    }

    pub fn save_model<B: Backend>(&self, model: &MlpClassifier<B>) -> Result<()> {
        let path = self.model_path::<B>();
        log::info!("Saving model to {path:?}");
        model
            .clone()
            .save_file(self.model_stem(), &RecorderTy::new())
            .map_err(|err| Error::Record {
                path,
                reason: err.to_string(),
            })
    }

    /// Loads the final model, or `None` if training never completed here.
    pub fn load_model<B: Backend>(
        &self,
        config: &MlpClassifierConfig,
        device: &B::Device,
    ) -> Result<Option<MlpClassifier<B>>> {
        load_record(self.model_stem(), config, device)
    }

    /// Path of the checkpoint the learner writes after `epoch`.
    pub fn checkpoint_path<B: Backend>(&self, epoch: usize) -> PathBuf {
        with_recorder_extension::<B>(self.checkpoint_stem(epoch))
    }

    fn checkpoint_stem(&self, epoch: usize) -> PathBuf {
        self.root
            .join(CHECKPOINT_DIR)
            .join(format!("{MODEL_NAME}-{epoch}"))
    }

    pub fn load_checkpoint<B: Backend>(
        &self,
        config: &MlpClassifierConfig,
        epoch: usize,
        device: &B::Device,
    ) -> Result<Option<MlpClassifier<B>>> {
        load_record(self.checkpoint_stem(epoch), config, device)
    }

    /// Epochs that have a model checkpoint on disk, in increasing order.
    pub fn checkpoint_epochs(&self) -> Result<Vec<usize>> {
        let dir = self.root.join(CHECKPOINT_DIR);
        if !dir.exists() {
            return Ok(vec![]);
        }
        let prefix = format!("{MODEL_NAME}-");
        let mut epochs: Vec<usize> = std::fs::read_dir(&dir)
            .map_err(Error::io(&dir))?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                let stem = path.file_stem()?.to_str()?;
                stem.strip_prefix(&prefix)?.parse().ok()
            })
            .collect();
        epochs.sort_unstable();
        Ok(epochs)
    }
}

pub fn load_training_config(path: &Path) -> Result<TrainingConfig> {
    log::info!("Loading training config from {path:?}");
    TrainingConfig::load(path).map_err(|err| Error::Config {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

fn with_recorder_extension<B: Backend>(stem: PathBuf) -> PathBuf {
    let file_ext = <RecorderTy as FileRecorder<B>>::file_extension();
    let mut path = stem.into_os_string();
    path.push(".");
    path.push(file_ext);
    path.into()
}

fn load_record<B: Backend>(
    stem: PathBuf,
    config: &MlpClassifierConfig,
    device: &B::Device,
) -> Result<Option<MlpClassifier<B>>> {
    let path = with_recorder_extension::<B>(stem.clone());
    if !std::fs::exists(&path).map_err(Error::io(&path))? {
        return Ok(None);
    }
    log::info!("Loading model from {path:?}");
    let model = config
        .init::<B>(device)
        .load_file(stem, &RecorderTy::new(), device)
        .map_err(|err| Error::Record {
            path,
            reason: err.to_string(),
        })?;
    Ok(Some(model))
}
