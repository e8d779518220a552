use std::path::PathBuf;

use stager_model::{ExperimentName, ModelError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(
        "experiment `{experiment}`: model references must both point at a trained experiment or both be external (query: `{query}`, passage: `{passage}`)"
    )]
    MismatchedReference {
        experiment: ExperimentName,
        query: String,
        passage: String,
    },

    #[error(
        "experiment `{experiment}`: query and passage models come from different experiments (`{query_upstream}` vs `{passage_upstream}`)"
    )]
    InconsistentPair {
        experiment: ExperimentName,
        query_upstream: ExperimentName,
        passage_upstream: ExperimentName,
    },

    #[error("upstream experiment `{experiment}` (required by `{required_by}`) has no config at {}; run it first", path.display())]
    MissingUpstreamConfig {
        experiment: ExperimentName,
        required_by: ExperimentName,
        path: PathBuf,
    },

    #[error("cyclic experiment reference: {chain}")]
    CyclicReference { chain: String },

    #[error("config for experiment `{experiment}` not found at {}", path.display())]
    ConfigNotFound {
        experiment: ExperimentName,
        path: PathBuf,
    },

    #[error("config for experiment `{experiment}` is unreadable: {reason}")]
    ConfigUnreadable {
        experiment: ExperimentName,
        reason: String,
    },

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// Failure reported by a [`ConfigLoader`](crate::ConfigLoader).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("config for `{experiment}` not found at {}", path.display())]
    NotFound {
        experiment: ExperimentName,
        path: PathBuf,
    },
    #[error("config for `{experiment}` is unreadable: {reason}")]
    Unreadable {
        experiment: ExperimentName,
        reason: String,
    },
}

impl From<LoadError> for CoreError {
    fn from(e: LoadError) -> Self {
        match e {
            LoadError::NotFound { experiment, path } => CoreError::ConfigNotFound { experiment, path },
            LoadError::Unreadable { experiment, reason } => {
                CoreError::ConfigUnreadable { experiment, reason }
            }
        }
    }
}

/// Failure reported by an [`IndexClient`](crate::IndexClient).
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index server unreachable: {0}")]
    Connection(String),
    #[error("collection not found: {0}")]
    CollectionNotFound(String),
    #[error("index server rejected request: {0}")]
    Rejected(String),
}

/// Failure reported by a [`JobScheduler`](crate::JobScheduler).
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("job `{name}` rejected: {reason}")]
    Rejected { name: String, reason: String },
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for SchedulerError {
    fn from(e: std::io::Error) -> Self {
        SchedulerError::Io(e.to_string())
    }
}
