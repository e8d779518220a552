use serde::{Deserialize, Serialize};

use crate::JobEnv;

/// Addresses and data locations of the shared stateful services.
///
/// Injected into every job environment after config-derived variables,
/// so these always win over a config key with the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Infrastructure {
    pub postgresql_address: String,
    pub milvus_address: String,
    pub postgresql_data_directory: String,
    pub milvus_data_directory: String,
    /// Experiment-tracking credentials, when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking: Option<Tracking>,
}

/// Experiment-tracking credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracking {
    pub api_key: String,
    pub project: String,
}

impl Infrastructure {
    pub const POSTGRESQL_SERVER_ADDRESS: &'static str = "POSTGRESQL_SERVER_ADDRESS";
    pub const MILVUS_SERVER_ADDRESS: &'static str = "MILVUS_SERVER_ADDRESS";
    pub const POSTGRESQL_DATA_DIRECTORY: &'static str = "POSTGRESQL_DATA_DIRECTORY";
    pub const MILVUS_DATA_DIRECTORY: &'static str = "MILVUS_DATA_DIRECTORY";
    pub const WANDB_API_KEY: &'static str = "WANDB_API_KEY";
    pub const WANDB_PROJECT: &'static str = "WANDB_PROJECT";
    pub const WANDB_RUN_NAME: &'static str = "WANDB_RUN_NAME";

    /// Render the fixed infrastructure variables.
    ///
    /// `run_name` is exported for tracking when credentials are present.
    pub fn env(&self, run_name: &str) -> JobEnv {
        let mut env = JobEnv::new();
        env.push(Self::POSTGRESQL_DATA_DIRECTORY, &self.postgresql_data_directory);
        env.push(Self::MILVUS_DATA_DIRECTORY, &self.milvus_data_directory);
        env.push(Self::POSTGRESQL_SERVER_ADDRESS, &self.postgresql_address);
        env.push(Self::MILVUS_SERVER_ADDRESS, &self.milvus_address);
        if let Some(tracking) = &self.tracking {
            env.push(Self::WANDB_API_KEY, &tracking.api_key);
            env.push(Self::WANDB_PROJECT, &tracking.project);
            env.push(Self::WANDB_RUN_NAME, run_name);
        }
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_vars_only_when_configured() {
        let mut infra = Infrastructure {
            postgresql_address: "db:5432".into(),
            milvus_address: "milvus:19530".into(),
            ..Default::default()
        };
        let env = infra.env("train___expA");
        assert_eq!(env.get(Infrastructure::MILVUS_SERVER_ADDRESS), Some("milvus:19530"));
        assert!(env.get(Infrastructure::WANDB_RUN_NAME).is_none());

        infra.tracking = Some(Tracking {
            api_key: "k".into(),
            project: "p".into(),
        });
        let env = infra.env("train___expA");
        assert_eq!(env.get(Infrastructure::WANDB_RUN_NAME), Some("train___expA"));
    }
}
