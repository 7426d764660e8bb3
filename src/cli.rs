use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::path::PathBuf;

pub const HELP: &str = "\
MNIST MLP

Trains a two-layer perceptron on the MNIST digits and evaluates it.
The model, learner checkpoints, metric logs and the training configuration are
persisted in an artifacts directory.

USAGE:
    mnist-mlp [OPTIONS]

When no --train, --test or --inference flag is provided, the program exits after
resolving and saving the training configuration.

BEHAVIOR OVERVIEW
- If --training-config is given, that config is used and saved into the artifacts directory
  (overwriting any existing file). Otherwise the config from the artifacts directory is used,
  falling back to the defaults.
- Training splits 5,000 images off the 60,000 training images for validation, shows a live
  dashboard, and writes per-epoch checkpoints and metric logs into the artifacts directory.
- Testing reads back the saved model (or a checkpoint, with --checkpoint) and reports loss,
  accuracy and per-digit accuracy over the 10,000 test images.
- When several actions are given they run in order: train, test, inference.

FLAGS:
    -h, --help                  Show this help message and exit

OPTIONS:
    -t, --train                 Train a model
    -e, --test                  Evaluate the saved model on the test split
    -i, --inference <N>         Print predictions for the first N test images
    -r, --remove-artifacts      Delete the previous model, checkpoints and metric logs before training
                                (has no effect if --train is not used, not allowed with --resume)
    -c, --training-config <PATH>
                                Load the training configuration from this file
    -d, --data-dir <PATH>       Directory holding the MNIST files, downloaded there when missing.
                                Defaults to ~/.cache/burn-dataset/mnist
    -a, --artifacts-path <PATH>
                                Directory where the configuration, model, checkpoints and metrics are saved.
                                Defaults to a newly created temporary directory (path will be printed).
        --checkpoint <EPOCH>    Evaluate the learner checkpoint of this epoch instead of the final model
                                (requires --test). The learner keeps the last two epochs and the one
                                with the best valid loss.
        --resume <EPOCH>        Resume training from the learner checkpoint of this epoch (requires --train)
";

#[derive(Debug)]
pub struct AppArgs {
    pub train: bool,
    pub test: bool,
    pub inference: Option<usize>,
    pub remove_artifacts: bool,
    pub training_config: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub artifacts_path: PathBuf,
    pub checkpoint: Option<usize>,
    pub resume: Option<usize>,
}

impl AppArgs {
    /// Parses the process arguments. `--help` prints the usage and exits.
    pub fn parse() -> Result<Self> {
        let mut pargs = pico_args::Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            println!("{}", HELP);
            std::process::exit(0);
        }

        Self::from_arguments(pargs)
    }

    pub fn from_arguments(mut pargs: pico_args::Arguments) -> Result<Self> {
        let data_dir = match pargs.opt_value_from_os_str(["-d", "--data-dir"], parse_path)? {
            Some(path) => path,
            None => crate::dataset::mnist::default_root().ok_or_else(|| {
                Error::InvalidArgument("no home directory, pass --data-dir".to_string())
            })?,
        };
        let artifacts_path = pargs.opt_value_from_os_str(["-a", "--artifacts-path"], parse_path)?;
        let artifacts_path = match artifacts_path {
            Some(path) => path,
            None => new_temporary_dir()?,
        };

        let args = AppArgs {
            training_config: pargs
                .opt_value_from_os_str(["-c", "--training-config"], parse_path)?,
            inference: pargs.opt_value_from_str(["-i", "--inference"])?,
            checkpoint: pargs.opt_value_from_str("--checkpoint")?,
            resume: pargs.opt_value_from_str("--resume")?,
            data_dir,
            artifacts_path,
            // must parse flags after values
            train: pargs.contains(["-t", "--train"]),
            test: pargs.contains(["-e", "--test"]),
            remove_artifacts: pargs.contains(["-r", "--remove-artifacts"]),
        };

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            return Err(Error::InvalidArgument(format!("unused arguments: {remaining:?}")));
        }
        args.check_combinations()?;

        Ok(args)
    }

    /// Options that only make sense along with an action flag.
    fn check_combinations(&self) -> Result<()> {
        if self.checkpoint.is_some() && !self.test {
            return Err(Error::InvalidArgument(
                "--checkpoint is only used with --test".to_string(),
            ));
        }
        if self.resume.is_some() && !self.train {
            return Err(Error::InvalidArgument(
                "--resume is only used with --train".to_string(),
            ));
        }
        // removing the artifacts would delete the checkpoint to resume from
        if self.resume.is_some() && self.remove_artifacts {
            return Err(Error::InvalidArgument(
                "--resume cannot be combined with --remove-artifacts".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<pico_args::Error> for Error {
    fn from(err: pico_args::Error) -> Self {
        Error::InvalidArgument(err.to_string())
    }
}

fn parse_path(s: &OsStr) -> std::result::Result<PathBuf, &'static str> {
    Ok(s.into())
}

/// e.g. /tmp/burn-mnist-mlp-abcd-0
fn new_temporary_dir() -> Result<PathBuf> {
    let name = format!("{}-", std::env!("CARGO_PKG_NAME"));
    let tmp = temp_dir::TempDir::with_prefix(name)
        .map_err(Error::io(std::env::temp_dir()))?
        .dont_delete_on_drop();
    let path = tmp.path().to_path_buf();
    println!("new artifacts directory: {path:?}");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn parse(args: &[&str]) -> Result<AppArgs> {
        let args = args.iter().map(OsString::from).collect();
        AppArgs::from_arguments(pico_args::Arguments::from_vec(args))
    }

    #[test]
    fn flags_and_values() {
        let args = parse(&[
            "-t",
            "--test",
            "-i",
            "8",
            "-a",
            "/tmp/run",
            "-d",
            "/data/mnist",
            "--checkpoint",
            "3",
        ])
        .unwrap();

        assert!(args.train);
        assert!(args.test);
        assert!(!args.remove_artifacts);
        assert_eq!(args.inference, Some(8));
        assert_eq!(args.checkpoint, Some(3));
        assert_eq!(args.resume, None);
        assert_eq!(args.artifacts_path, PathBuf::from("/tmp/run"));
        assert_eq!(args.data_dir, PathBuf::from("/data/mnist"));
        assert!(args.training_config.is_none());
    }

    #[test]
    fn unused_arguments_are_rejected() {
        let err = parse(&["-a", "/tmp/run", "-d", "/data", "--epochs"]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn bad_number_is_rejected() {
        let err = parse(&["-a", "/tmp/run", "-d", "/data", "-i", "many"]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn options_without_their_action_are_rejected() {
        let err = parse(&["-a", "/tmp/run", "-d", "/data", "--checkpoint", "2"]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = parse(&["-a", "/tmp/run", "-d", "/data", "-e", "--resume", "2"]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let args = parse(&["-a", "/tmp/run", "-d", "/data", "-t", "--resume", "2"]).unwrap();
        assert_eq!(args.resume, Some(2));
    }

    #[test]
    fn resume_keeps_the_artifacts() {
        let err = parse(&["-a", "/tmp/run", "-d", "/data", "-t", "-r", "--resume", "2"]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
