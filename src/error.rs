use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the parts of the workflow this crate owns: the dataset
/// files and the artifacts directory. Everything else is the framework's.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed or truncated IDX payload.
    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Failed to load config {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },

    /// Saving or loading a model record failed.
    #[error("Record error on {path:?}: {reason}")]
    Record { path: PathBuf, reason: String },

    /// Tensor values could not be read back on the host.
    #[error("Tensor data error: {0}")]
    TensorData(String),

    #[error("No trained model found at {0:?}; run with --train first")]
    MissingModel(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<burn::tensor::DataError> for Error {
    fn from(err: burn::tensor::DataError) -> Self {
        Error::TensorData(format!("{err:?}"))
    }
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Error::Io { path, source }
    }
}
