use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Phase of the pipeline with its own job spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// Train the paired encoders.
    Train,
    /// Embed a dataset into the shared vector index.
    Index,
    /// Retrieve against the index for a prediction input.
    Predict,
}

impl Stage {
    /// Short symbolic name, used as the namespace prefix of job names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Train => "train",
            Stage::Index => "index",
            Stage::Predict => "predict",
        }
    }

    /// Returns `true` for stages that consume an already trained experiment.
    pub fn needs_trained_model(&self) -> bool {
        matches!(self, Stage::Index | Stage::Predict)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "train" => Ok(Stage::Train),
            "index" => Ok(Stage::Index),
            "predict" => Ok(Stage::Predict),
            _ => Err(ModelError::UnknownStage(s.to_string())),
        }
    }
}
