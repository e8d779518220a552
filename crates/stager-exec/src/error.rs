use std::path::PathBuf;

use stager_core::IndexError;
use stager_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("invalid slice: {0}")]
    InvalidSlice(#[from] ModelError),
    #[error("malformed record at {}:{line}: {source}", path.display())]
    MalformedRecord {
        path: PathBuf,
        /// One-based physical line number.
        line: u64,
        #[source]
        source: serde_json::Error,
    },
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("index write failed: {0}")]
    Index(#[from] IndexError),
}

impl ExecError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> ExecError {
        let path = path.into();
        move |source| ExecError::Io { path, source }
    }
}

pub type ExecResult<T> = Result<T, ExecError>;
