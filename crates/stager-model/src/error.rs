use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid experiment name `{name}`: {reason}")]
    InvalidExperimentName { name: String, reason: &'static str },
    #[error("unknown stage: {0} (expected: train|index|predict)")]
    UnknownStage(String),
    #[error("unknown index type: {0} (expected: FLAT|IVF_FLAT|HNSW)")]
    UnknownIndexType(String),
    #[error("invalid slice {index}/{count}: slice index must be below the slice count")]
    InvalidSlice { index: usize, count: usize },
    #[error("dependency chain exceeds depth {max}: {chain}")]
    ChainTooDeep { max: usize, chain: String },
}
