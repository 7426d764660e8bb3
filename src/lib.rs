//! Two-layer perceptron on MNIST, trained with burn's `Learner`.
//!
//! The workflow is linear: resolve the training config, [fit](training::fit)
//! the model on the training partition while validating on a held-out one,
//! then read the saved model back to [test](evaluation::test) it and to show a
//! few [predictions](inference::infer).

pub mod artifacts;
pub mod backend;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod inference;
pub mod model;
pub mod training;

pub use error::{Error, Result};

use artifacts::Artifacts;
use backend::MainDevice;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::train::{ApplicationLoggerInstaller, FileApplicationLoggerInstaller};
use cli::AppArgs;

pub const EXPERIMENT_LOG: &str = "experiment.log";

/// Runs the actions requested on the command line, in order: train, test, inference.
pub fn launch<B, AutoB>(app_args: &AppArgs) -> Result<()>
where
    B: Backend + MainDevice,
    AutoB: AutodiffBackend<InnerBackend = B> + MainDevice,
{
    let artifacts = Artifacts::new(&app_args.artifacts_path);
    artifacts.create(app_args.remove_artifacts && app_args.train)?;

    let log_path = artifacts.root().join(EXPERIMENT_LOG);
    let logger = FileApplicationLoggerInstaller::new(&*log_path.to_string_lossy());
    if let Err(err) = logger.install() {
        eprintln!("application log not installed: {err}");
    }

    // a config given on the command line wins over the one saved by a previous run
    let training_config = match &app_args.training_config {
        Some(path) => artifacts::load_training_config(path)?,
        None => artifacts.load_training_config()?.unwrap_or_default(),
    };
    artifacts.save_training_config(&training_config)?;
    log::info!("Training config: {training_config}");

    if app_args.train {
        let training_device = AutoB::main_device();
        training::fit::<AutoB>(
            &training_config,
            &app_args.data_dir,
            &artifacts,
            app_args.resume,
            training_device,
        )?;
    }

    if app_args.test {
        let test_device = B::main_device();
        let report = evaluation::test::<B>(
            &training_config,
            &app_args.data_dir,
            &artifacts,
            app_args.checkpoint,
            test_device,
        )?;
        println!("{report}");
    }

    if let Some(num_samples) = app_args.inference {
        let infer_device = B::main_device();
        let predictions = inference::infer::<B>(
            &training_config,
            &app_args.data_dir,
            &artifacts,
            num_samples,
            infer_device,
        )?;
        let correct = predictions.iter().filter(|p| p.is_correct()).count();
        println!("{correct}/{} predictions correct", predictions.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MainAutoBackend, MainBackend};
    use crate::config::TrainingConfig;
    use std::path::Path;
    use temp_dir::TempDir;

    fn resolve_only(artifacts_path: &Path, training_config: Option<&Path>) -> AppArgs {
        AppArgs {
            train: false,
            test: false,
            inference: None,
            remove_artifacts: false,
            training_config: training_config.map(Path::to_path_buf),
            data_dir: artifacts_path.join("mnist"),
            artifacts_path: artifacts_path.to_path_buf(),
            checkpoint: None,
            resume: None,
        }
    }

    #[test]
    fn command_line_config_wins_and_is_persisted() {
        let dir = TempDir::new().unwrap();
        let run = dir.path().join("run");
        let artifacts = Artifacts::new(&run);
        artifacts.create(false).unwrap();
        artifacts
            .save_training_config(&TrainingConfig::default().with_batch_size(7))
            .unwrap();
        let given = dir.path().join("given.json");
        TrainingConfig::default()
            .with_batch_size(9)
            .save(&given)
            .unwrap();

        launch::<MainBackend, MainAutoBackend>(&resolve_only(&run, Some(&given))).unwrap();

        let saved = artifacts.load_training_config().unwrap().unwrap();
        assert_eq!(saved.batch_size, 9);
    }

    #[test]
    fn saved_config_is_reused() {
        let dir = TempDir::new().unwrap();
        let artifacts = Artifacts::new(dir.path());
        artifacts.create(false).unwrap();
        artifacts
            .save_training_config(&TrainingConfig::default().with_num_epochs(11))
            .unwrap();

        launch::<MainBackend, MainAutoBackend>(&resolve_only(dir.path(), None)).unwrap();

        let saved = artifacts.load_training_config().unwrap().unwrap();
        assert_eq!(saved.num_epochs, 11);
    }

    #[test]
    fn defaults_are_written_without_any_config() {
        let dir = TempDir::new().unwrap();
        let run = dir.path().join("fresh");

        launch::<MainBackend, MainAutoBackend>(&resolve_only(&run, None)).unwrap();

        let saved = Artifacts::new(&run).load_training_config().unwrap().unwrap();
        let defaults = TrainingConfig::default();
        assert_eq!(saved.batch_size, defaults.batch_size);
        assert_eq!(saved.num_epochs, defaults.num_epochs);
        assert_eq!(saved.valid_size, defaults.valid_size);
    }

    #[test]
    fn missing_command_line_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.json");

        let err = launch::<MainBackend, MainAutoBackend>(&resolve_only(dir.path(), Some(&missing)))
            .unwrap_err();

        assert!(matches!(err, Error::Config { .. }));
    }
}
